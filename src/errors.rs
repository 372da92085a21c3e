/*******************************************************************************
 * Copyright (c) 2020 Association Cénotélie (cenotelie.fr)
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Lesser General Public License as
 * published by the Free Software Foundation, either version 3
 * of the License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General
 * Public License along with this program.
 * If not, see <http://www.gnu.org/licenses/>.
 ******************************************************************************/

//! Module for the errors of this crate

use std::error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// The possible errors raised by the search core
#[derive(Debug)]
pub enum Error {
    /// An error from the underlying I/O layer while writing a report
    Io(io::Error),
    /// The shortest-path search drained its queue without reaching the
    /// conflict state item on the requested lookahead
    NoShortestPath,
    /// The provided grammar facts violate an expected shape
    MalformedGrammar(String)
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::NoShortestPath => {
                write!(f, "Cannot find shortest path to conflict state.")
            }
            Error::MalformedGrammar(msg) => write!(f, "Malformed grammar facts: {}", msg)
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
