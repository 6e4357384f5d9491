//! 版本比较
//!
//! 版本号按有序元组比较（`major.minor.patch`），不做约束求解。
//! 每个分量取开头的数字部分，预发布后缀被忽略，缺失的分量视为 0。

use std::cmp::Ordering;

/// 比较两个版本号
///
/// # 示例
///
/// ```rust
/// use std::cmp::Ordering;
/// use chips_updater::utils::version::compare_versions;
///
/// assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
/// assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Equal);
/// ```
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    compare_tuples(&to_tuple(left), &to_tuple(right))
}

/// 判断 `candidate` 是否比 `installed` 更新
///
/// # 示例
///
/// ```rust
/// use chips_updater::utils::version::is_newer;
///
/// assert!(is_newer("1.0.0", "1.0.1"));
/// assert!(!is_newer("1.0.1", "1.0.1"));
/// ```
pub fn is_newer(installed: &str, candidate: &str) -> bool {
    compare_versions(installed, candidate) == Ordering::Less
}

fn to_tuple(version: &str) -> Vec<u64> {
    let core = version.trim().trim_start_matches('v');
    let core = core.split(['-', '+']).next().unwrap_or(core);
    core.split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

fn compare_tuples(left: &[u64], right: &[u64]) -> Ordering {
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.9.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.99.99"), Ordering::Greater);
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn test_tuple_fallback() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
        assert_eq!(compare_versions("v3.1", "3.0.9"), Ordering::Greater);
        assert_eq!(compare_versions("0.0.0", "1"), Ordering::Less);
    }

    #[test]
    fn test_prerelease_suffix_ignored() {
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1-beta", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.0.0", "2.0.0"));
        assert!(!is_newer("2.0.0", "1.0.0"));
        assert!(!is_newer("1.0.0", "1.0.0"));
    }
}
