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

const REFERENCED: u8 = 1 << 0;
const MODIFIED: u8 = 1 << 1;

/*
The bit usage is as follows:
|Bit|Usage|
0    Referenced (accessed since the clock hand last cleared it)
1    Modified (written since the page was loaded, needs a write back on eviction)
2-7  [Unused]

Validity is not stored here, it is derived from the assigned frame.
*/

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub(crate) struct PageStatus {
    bit_list: u8,
}

macro_rules! generate_functions {
    ($bit: ident, $get_name: ident, $set_name: ident) => {
        #[inline]
        pub(crate) fn $get_name(&self) -> bool {
            self.is_set($bit)
        }

        #[inline]
        pub(crate) fn $set_name(&mut self, val: bool) {
            self.set($bit, val);
        }
    };
}

impl PageStatus {
    #[inline]
    fn is_set(&self, bitmask: u8) -> bool {
        (self.bit_list & bitmask) != 0
    }

    #[inline]
    fn set(&mut self, bitmask: u8, state: bool) {
        if state {
            self.bit_list |= bitmask;
        } else {
            self.bit_list &= !bitmask;
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.bit_list = 0;
    }

    generate_functions!(REFERENCED, is_referenced, set_referenced);
    generate_functions!(MODIFIED, is_modified, set_modified);
}

#[cfg(test)]
mod test {
    use super::PageStatus;

    #[test]
    fn test_bits_are_independent() {
        let mut status = PageStatus::default();
        assert!(!status.is_referenced());
        assert!(!status.is_modified());

        status.set_referenced(true);
        status.set_modified(true);
        status.set_referenced(false);
        assert!(!status.is_referenced());
        assert!(status.is_modified());

        status.clear();
        assert_eq!(status, PageStatus::default());
    }
}
