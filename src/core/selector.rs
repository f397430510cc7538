use crate::core::github::Asset;

/// Naming token carried by every GE-Proton payload archive.
pub const FAMILY_TOKEN: &str = "ge-proton";

const TARBALL_SUFFIX: &str = ".tar.gz";

fn is_tarball(name: &str) -> bool {
    name.to_lowercase().ends_with(TARBALL_SUFFIX)
}

fn is_family_tarball(name: &str) -> bool {
    is_tarball(name) && name.to_lowercase().contains(FAMILY_TOKEN)
}

/// Picks the archive to install from a release's assets.
///
/// `.tar.gz` assets carrying the `ge-proton` token are preferred; when none
/// exist any `.tar.gz` qualifies. Among the winning tier the largest declared
/// size wins, and equal sizes keep their original order, so checksum or
/// signature sidecars never beat the payload.
pub fn select_installable_asset(assets: &[Asset]) -> Option<&Asset> {
    let mut candidates: Vec<&Asset> = assets
        .iter()
        .filter(|a| is_family_tarball(&a.name))
        .collect();

    if candidates.is_empty() {
        candidates = assets.iter().filter(|a| is_tarball(&a.name)).collect();
    }

    // stable: ties keep first-encountered order
    candidates.sort_by(|a, b| b.size.cmp(&a.size));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, size: u64) -> Asset {
        Asset {
            name: name.to_string(),
            browser_download_url: format!("https://example.invalid/{name}"),
            size,
            content_type: None,
        }
    }

    #[test]
    fn test_largest_wins_and_ties_keep_order() {
        let assets = vec![
            asset("x-ge-proton.tar.gz", 100),
            asset("y-ge-proton.tar.gz", 500),
            asset("z-ge-proton.tar.gz", 500),
        ];
        let picked = select_installable_asset(&assets).unwrap();
        assert_eq!(picked.name, "y-ge-proton.tar.gz");
    }

    #[test]
    fn test_fallback_to_any_tarball() {
        let assets = vec![asset("readme.txt", 0), asset("build.tar.gz", 10)];
        let picked = select_installable_asset(&assets).unwrap();
        assert_eq!(picked.name, "build.tar.gz");
    }

    #[test]
    fn test_family_tier_beats_larger_generic_tarball() {
        let assets = vec![
            asset("sources.tar.gz", 9_000_000),
            asset("GE-Proton9-5.tar.gz", 400_000),
            asset("GE-Proton9-5.sha512sum", 140),
        ];
        let picked = select_installable_asset(&assets).unwrap();
        assert_eq!(picked.name, "GE-Proton9-5.tar.gz");
    }

    #[test]
    fn test_suffix_match_is_case_insensitive() {
        let assets = vec![asset("GE-PROTON8-25.TAR.GZ", 1)];
        assert!(select_installable_asset(&assets).is_some());
    }

    #[test]
    fn test_no_tarball_selects_nothing() {
        let assets = vec![
            asset("GE-Proton9-5.tar.zst", 100),
            asset("GE-Proton9-5.tar.gz.sha512sum", 1),
        ];
        assert!(select_installable_asset(&assets).is_none());
        assert!(select_installable_asset(&[]).is_none());
    }
}
