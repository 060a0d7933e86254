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

//! Strain gauge load cell sampling, weight conversion and interactive calibration.
//!
//! The [`weight`] module holds the measurement chain (sensor interface, sampler,
//! averager, conversion and calibration arithmetic). The [`application`] module
//! holds the two long running loops built on top of it: the operator driven
//! calibration session and the periodic weight reporter.

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod application;
pub mod config;
pub mod weight;

#[cfg(test)]
pub(crate) mod testutil;
