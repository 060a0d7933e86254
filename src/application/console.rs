// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use core::fmt::{self, Write as _};
use embedded_io_async::{Read, Write};
use heapless::String;

pub const INPUT_LINE_CAPACITY: usize = 32;
/// Fits the longest report line: a prefix plus a `{:.6}` f32 of up to 47 characters.
pub const OUTPUT_LINE_CAPACITY: usize = 128;

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError<IoE> {
    Io(IoE),
    /// Input line or formatted output did not fit its buffer.
    LineTooLong,
    EndOfInput,
}

/// Line oriented text console over a byte stream.
pub struct Console<IO> {
    io: IO,
    line: String<INPUT_LINE_CAPACITY>,
}

impl<IO> Console<IO>
where
    IO: embedded_io_async::ErrorType,
{
    pub fn new(io: IO) -> Self {
        Self {
            io,
            line: String::new(),
        }
    }
}

impl<IO> Console<IO>
where
    IO: Read,
{
    /// Next `\n` terminated line with surrounding whitespace trimmed. An over-long
    /// line is consumed up to its terminator and reported as [`ConsoleError::LineTooLong`].
    pub async fn read_line(&mut self) -> Result<&str, ConsoleError<IO::Error>> {
        self.line.clear();
        let mut overflowed = false;
        let mut byte = [0u8; 1];

        loop {
            let n = self.io.read(&mut byte).await.map_err(ConsoleError::Io)?;
            if n == 0 {
                return Err(ConsoleError::EndOfInput);
            }
            match byte[0] {
                b'\n' => break,
                b => {
                    // commands are ASCII, anything else can only make the line invalid
                    let c = if b.is_ascii() {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    };
                    if self.line.push(c).is_err() {
                        overflowed = true;
                    }
                }
            }
        }

        if overflowed {
            return Err(ConsoleError::LineTooLong);
        }
        Ok(self.line.trim())
    }
}

impl<IO> Console<IO>
where
    IO: Write,
{
    pub async fn println(&mut self, args: fmt::Arguments<'_>) -> Result<(), ConsoleError<IO::Error>> {
        let mut out = String::<OUTPUT_LINE_CAPACITY>::new();
        out.write_fmt(args).map_err(|_| ConsoleError::LineTooLong)?;
        out.push_str("\r\n").map_err(|_| ConsoleError::LineTooLong)?;
        self.io
            .write_all(out.as_bytes())
            .await
            .map_err(ConsoleError::Io)?;
        self.io.flush().await.map_err(ConsoleError::Io)
    }

    pub async fn print_lines(&mut self, lines: &[&str]) -> Result<(), ConsoleError<IO::Error>> {
        for line in lines {
            self.println(format_args!("{}", line)).await?;
        }
        Ok(())
    }
}
