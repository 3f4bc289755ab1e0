//! Byte budget helpers.

/// `n` KiB in bytes.
#[inline]
#[must_use]
pub const fn kilobytes(n: usize) -> usize {
    1024 * n
}

/// `n` MiB in bytes.
#[inline]
#[must_use]
pub const fn megabytes(n: usize) -> usize {
    1024 * kilobytes(n)
}

/// `n` GiB in bytes.
#[inline]
#[must_use]
pub const fn gigabytes(n: usize) -> usize {
    1024 * megabytes(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(kilobytes(64), 65_536);
        assert_eq!(megabytes(16), 1 << 24);
        assert_eq!(gigabytes(1), 1 << 30);
    }
}
