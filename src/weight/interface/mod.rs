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

pub mod hx711async;

#[allow(async_fn_in_trait)]
pub trait AsyncStrainGaugeInterface {
    type Error;

    /// Initialise the gauge and make it ready for taking readings. Will put it into an initalized,
    /// powered up state.
    async fn initialize(&mut self) -> Result<(), Self::Error>;

    /// True once a conversion is waiting to be clocked out.
    fn is_ready(&mut self) -> Result<bool, Self::Error>;

    /// Clocks out the pending conversion. Callers are expected to check [`Self::is_ready`]
    /// first; the value read from a gauge that is not ready is undefined.
    async fn get_next_reading(&mut self) -> Result<i32, Self::Error>;
}
