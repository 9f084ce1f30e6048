/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

mod allocator;
mod cow;
mod paging;

use crate::ReferenceString;

pub(crate) const SEED: u64 = 5446535461589659585;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 22 references over the pages 0..=7
pub(crate) fn classic_reference_string() -> ReferenceString {
    ReferenceString::reads(&[7, 0, 1, 2, 0, 3, 0, 4, 2, 3, 0, 3, 0, 3, 2, 1, 2, 0, 1, 7, 0, 1])
}

/// Shows Belady's anomaly under FIFO
pub(crate) fn belady_reference_string() -> ReferenceString {
    ReferenceString::reads(&[1, 2, 3, 4, 1, 2, 5, 1, 2, 3, 4, 5])
}
