//! Decides whether recommend-place input already names a region.

/// Classifies raw recommend-place input.
pub trait RegionClassifier: Send + Sync {
    /// `true` when the input is an explicit region name such as
    /// `"서울특별시 강남구"`, `false` when it needs the LLM to interpret it.
    fn is_explicit_region(&self, input: &str) -> bool;
}

/// Administrative-unit suffixes recognised by [`AdministrativeSuffixClassifier`].
const ADMINISTRATIVE_SUFFIXES: [char; 4] = ['시', '도', '군', '구'];

/// Matches when the trimmed input contains a space and any administrative
/// suffix character anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdministrativeSuffixClassifier;

impl RegionClassifier for AdministrativeSuffixClassifier {
    fn is_explicit_region(&self, input: &str) -> bool {
        let input = input.trim();
        input.contains(' ') && input.contains(ADMINISTRATIVE_SUFFIXES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_regions() {
        let c = AdministrativeSuffixClassifier;
        assert!(c.is_explicit_region("서울특별시 강남구"));
        assert!(c.is_explicit_region("  경기도 수원시  "));
        assert!(c.is_explicit_region("강원특별자치도 양양군"));
    }

    #[test]
    fn test_not_explicit() {
        let c = AdministrativeSuffixClassifier;
        assert!(!c.is_explicit_region("강남구"));
        assert!(!c.is_explicit_region("경복궁에서 출발할래요"));
        assert!(!c.is_explicit_region("I pick Gyeongbokgung"));
        assert!(!c.is_explicit_region(""));
    }

    #[test]
    fn test_suffix_anywhere_matches() {
        // The heuristic only needs the character somewhere in the input.
        let c = AdministrativeSuffixClassifier;
        assert!(c.is_explicit_region("남산타워 시작"));
    }
}
