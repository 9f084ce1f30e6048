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

use core::{fmt, str::FromStr};

use crate::{
    error::{Result, VMError},
    page_table::PageNumber,
};

/// One memory reference issued by a simulated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageReference {
    pub page: PageNumber,
    pub is_write: bool,
}

impl PageReference {
    #[inline]
    pub const fn read(page: PageNumber) -> Self {
        Self {
            page,
            is_write: false,
        }
    }

    #[inline]
    pub const fn write(page: PageNumber) -> Self {
        Self {
            page,
            is_write: true,
        }
    }
}

impl fmt::Display for PageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_write {
            write!(f, "{}w", self.page)
        } else {
            write!(f, "{}", self.page)
        }
    }
}

/// Ordered sequence of page references that drives a simulation.
///
/// Textual form is a comma and/or whitespace separated list of page numbers,
/// a trailing `w` marks a write (e.g. `"7, 0, 1w, 2"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceString {
    references: Vec<PageReference>,
}

fn to_page_number(value: i64, position: usize) -> Result<PageNumber> {
    PageNumber::try_from(value).map_err(|_| {
        VMError::invalid_config(format!(
            "negative page number {} at position {}",
            value, position
        ))
    })
}

impl ReferenceString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only references to `pages`
    pub fn reads(pages: &[PageNumber]) -> Self {
        pages.iter().copied().map(PageReference::read).collect()
    }

    /// Validates signed page numbers coming from an outer caller
    pub fn from_signed(pages: &[i64]) -> Result<Self> {
        Self::with_writes(pages, &[])
    }

    /// Pairs `pages` with `writes`. Positions without a write flag are reads.
    pub fn with_writes(pages: &[i64], writes: &[bool]) -> Result<Self> {
        pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                Ok(PageReference {
                    page: to_page_number(*page, i)?,
                    is_write: writes.get(i).copied().unwrap_or(false),
                })
            })
            .collect()
    }

    pub fn push(&mut self, reference: PageReference) {
        self.references.push(reference);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[PageReference] {
        &self.references
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageReference> + '_ {
        self.references.iter()
    }

    pub fn pages(&self) -> impl Iterator<Item = PageNumber> + '_ {
        self.references.iter().map(|reference| reference.page)
    }

    /// The first `len` references
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            references: self.references.iter().take(len).copied().collect(),
        }
    }
}

impl FromIterator<PageReference> for ReferenceString {
    fn from_iter<T: IntoIterator<Item = PageReference>>(iter: T) -> Self {
        Self {
            references: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ReferenceString {
    type Item = &'a PageReference;
    type IntoIter = core::slice::Iter<'a, PageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

impl FromStr for ReferenceString {
    type Err = VMError;

    fn from_str(text: &str) -> Result<Self> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .enumerate()
            .map(|(i, token)| {
                let (number, is_write) = match token.strip_suffix(['w', 'W']) {
                    Some(number) => (number, true),
                    None => (token.strip_suffix(['r', 'R']).unwrap_or(token), false),
                };

                let value: i64 = number.parse().map_err(|_| {
                    VMError::invalid_config(format!(
                        "malformed page reference '{}' at position {}",
                        token, i
                    ))
                })?;

                Ok(PageReference {
                    page: to_page_number(value, i)?,
                    is_write,
                })
            })
            .collect()
    }
}

impl fmt::Display for ReferenceString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reference) in self.references.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", reference)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{PageReference, ReferenceString};
    use crate::error::VMError;

    #[test]
    fn test_parse_reads_and_writes() {
        let refs: ReferenceString = "7, 0 1w,2W 3r".parse().unwrap();
        assert_eq!(
            refs.as_slice(),
            &[
                PageReference::read(7),
                PageReference::read(0),
                PageReference::write(1),
                PageReference::write(2),
                PageReference::read(3),
            ]
        );
        assert_eq!(refs.to_string(), "7,0,1w,2w,3");
    }

    #[test]
    fn test_negative_pages_rejected() {
        let err = ReferenceString::from_signed(&[1, 2, -3]).unwrap_err();
        assert!(matches!(err, VMError::InvalidConfiguration(_)));

        "1,-2".parse::<ReferenceString>().expect_err("negative page");
        "1,x".parse::<ReferenceString>().expect_err("not a number");
    }

    #[test]
    fn test_missing_write_flags_are_reads() {
        let refs = ReferenceString::with_writes(&[4, 5, 6], &[true]).unwrap();
        let writes: Vec<bool> = refs.iter().map(|r| r.is_write).collect();
        assert_eq!(writes, vec![true, false, false]);
        assert_eq!(refs.prefix(2).len(), 2);
    }
}
