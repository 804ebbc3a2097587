// ABOUTME: Integration tests for the retention policy engine.
// ABOUTME: Covers worked scenarios, config parsing, and property-based invariants.

mod support;

use proptest::prelude::*;
use registry_gc::policy::{RetentionPolicy, compute_deletion_set};
use registry_gc::types::{Digest, Image};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use support::{digest, image};

fn digests(set: &[&Image]) -> Vec<Digest> {
    set.iter().map(|image| image.digest().clone()).collect()
}

fn digest_set(set: &[&Image]) -> HashSet<Digest> {
    set.iter().map(|image| image.digest().clone()).collect()
}

fn cap(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

mod scenarios {
    use super::*;

    #[test]
    fn untagged_and_expired_release_are_deleted() {
        let images = vec![
            image(1, &[], 1),
            image(2, &["release-1"], 2),
            image(3, &["release-2"], 3),
        ];
        let policy = RetentionPolicy::new()
            .with_delete_untagged(true)
            .with_keep("release", 1);

        let set = compute_deletion_set(&images, &policy);

        assert_eq!(digests(&set), vec![digest(1), digest(2)]);
    }

    #[test]
    fn cap_deletes_oldest_unprotected_excess() {
        // 995 builds followed by the 5 newest releases
        let images: Vec<Image> = (0..1000)
            .map(|n| {
                let tag = if n >= 995 {
                    format!("release-{n}")
                } else {
                    format!("build-{n}")
                };
                image(n, &[tag.as_str()], n as i64)
            })
            .collect();
        let policy = RetentionPolicy::new()
            .with_keep("release", 5)
            .with_max_images(cap(900));

        let set = compute_deletion_set(&images, &policy);

        assert_eq!(set.len(), 100);
        assert_eq!(digests(&set), (0..100).map(digest).collect::<Vec<_>>());
    }

    #[test]
    fn keep_window_overflow_is_deleted_regardless_of_cap() {
        let images: Vec<Image> = (0..1000)
            .map(|n| image(n, &[format!("build-{n}").as_str()], n as i64))
            .collect();
        let policy = RetentionPolicy::new()
            .with_keep("build", 5)
            .with_max_images(cap(900));

        let set = compute_deletion_set(&images, &policy);

        assert_eq!(set.len(), 995);
        assert!(set.iter().all(|image| image.pushed_at() < support::at(995)));
    }

    #[test]
    fn equal_push_times_order_by_digest() {
        let images = vec![image(9, &[], 5), image(3, &[], 5), image(7, &[], 5)];
        let policy = RetentionPolicy::new().with_delete_untagged(true);

        let first = digests(&compute_deletion_set(&images, &policy));
        let second = digests(&compute_deletion_set(&images, &policy));

        assert_eq!(first, vec![digest(3), digest(7), digest(9)]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_policy_deletes_nothing() {
        let images = vec![image(1, &[], 1), image(2, &["release-1"], 2)];
        assert!(compute_deletion_set(&images, &RetentionPolicy::default()).is_empty());
    }

    #[test]
    fn image_in_two_windows_is_protected_by_either() {
        let images = vec![
            image(1, &["release-1", "build-1"], 1),
            image(2, &["build-2"], 2),
        ];
        let policy = RetentionPolicy::new()
            .with_keep("release", 1)
            .with_keep("build", 1);

        let set = compute_deletion_set(&images, &policy);

        assert!(set.is_empty());
    }

    #[test]
    fn cap_never_touches_protected_images() {
        let images: Vec<Image> = (0..4)
            .map(|n| image(n, &[format!("release-{n}").as_str()], n as i64))
            .collect();
        let policy = RetentionPolicy::new()
            .with_keep("release", 4)
            .with_max_images(cap(1));

        assert!(compute_deletion_set(&images, &policy).is_empty());
    }

    #[test]
    fn duplicate_digest_appears_once() {
        let images = vec![image(1, &[], 1), image(1, &[], 1)];
        let policy = RetentionPolicy::new().with_delete_untagged(true);

        assert_eq!(compute_deletion_set(&images, &policy).len(), 1);
    }
}

mod parsing {
    use registry_gc::config::Config;
    use registry_gc::policy::PolicyError;

    #[test]
    fn policy_from_yaml() {
        let yaml = r#"
registry:
  url: http://localhost:5000
policy:
  delete_untagged: true
  keep:
    release: 4
    build: 8
  max_images: 900
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.policy.delete_untagged);
        assert_eq!(config.policy.keep.get("build"), Some(8));
        assert_eq!(config.policy.max_images.map(|c| c.get()), Some(900));
    }

    #[test]
    fn negative_keep_count_is_rejected() {
        let yaml = r#"
registry:
  url: http://localhost:5000
policy:
  keep:
    release: -1
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("negative"), "{err}");
    }

    #[test]
    fn zero_cap_is_rejected() {
        let yaml = r#"
registry:
  url: http://localhost:5000
policy:
  max_images: 0
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn cli_rule_errors_name_the_prefix() {
        let err = "release=abc"
            .parse::<registry_gc::policy::KeepRule>()
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::InvalidCount {
                prefix: "release".to_string(),
                value: "abc".to_string()
            }
        );
    }
}

fn arb_images() -> impl Strategy<Value = Vec<Image>> {
    prop::collection::vec((0u8..5, 0i64..40), 0..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(n, (kind, secs))| {
                let release = format!("release-{n}");
                let build = format!("build-{n}");
                let tags: Vec<&str> = match kind {
                    0 => vec![],
                    1 => vec![release.as_str()],
                    2 => vec![build.as_str()],
                    3 => vec![release.as_str(), build.as_str()],
                    _ => vec!["latest"],
                };
                image(n as u64, &tags, secs)
            })
            .collect()
    })
}

fn arb_policy() -> impl Strategy<Value = RetentionPolicy> {
    (
        any::<bool>(),
        prop::option::of(0u32..6),
        prop::option::of(0u32..6),
        prop::option::of(1usize..30),
    )
        .prop_map(|(untagged, release, build, max)| {
            let mut policy = RetentionPolicy::new().with_delete_untagged(untagged);
            if let Some(count) = release {
                policy = policy.with_keep("release", count);
            }
            if let Some(count) = build {
                policy = policy.with_keep("build", count);
            }
            if let Some(max) = max {
                policy = policy.with_max_images(cap(max));
            }
            policy
        })
}

/// Digests inside some keep window.
fn window_digests(images: &[Image], policy: &RetentionPolicy) -> HashSet<Digest> {
    let mut protected = HashSet::new();
    for (prefix, count) in policy.keep.iter() {
        let mut matching: Vec<&Image> = images
            .iter()
            .filter(|image| image.has_tag_prefix(prefix))
            .collect();
        matching.sort_by(|a, b| a.cmp_newest_first(b));
        protected.extend(
            matching
                .into_iter()
                .take(count as usize)
                .map(|image| image.digest().clone()),
        );
    }
    protected
}

proptest! {
    #[test]
    fn deterministic_and_ordered(images in arb_images(), policy in arb_policy()) {
        let first = compute_deletion_set(&images, &policy);
        let second = compute_deletion_set(&images, &policy);
        prop_assert_eq!(digests(&first), digests(&second));

        for pair in first.windows(2) {
            prop_assert!(pair[0].cmp_oldest_first(pair[1]).is_lt());
        }
    }

    #[test]
    fn keep_windows_are_never_deleted(images in arb_images(), policy in arb_policy()) {
        let protected = window_digests(&images, &policy);
        let set = compute_deletion_set(&images, &policy);
        for image in set {
            prop_assert!(!protected.contains(image.digest()));
        }
    }

    #[test]
    fn untagged_images_follow_the_flag(images in arb_images(), policy in arb_policy()) {
        let set = digest_set(&compute_deletion_set(&images, &policy));
        for image in images.iter().filter(|image| image.is_untagged()) {
            if policy.delete_untagged {
                prop_assert!(set.contains(image.digest()));
            } else if policy.max_images.is_none() {
                prop_assert!(!set.contains(image.digest()));
            }
        }
    }

    #[test]
    fn survivors_respect_cap_when_possible(images in arb_images(), policy in arb_policy()) {
        let set = compute_deletion_set(&images, &policy);
        if let Some(max) = policy.max_images {
            let protected = window_digests(&images, &policy).len();
            let survivors = images.len() - set.len();
            prop_assert!(survivors <= max.get().max(protected));
        }
    }

    #[test]
    fn second_pass_deletes_nothing(images in arb_images(), policy in arb_policy()) {
        let deleted = digest_set(&compute_deletion_set(&images, &policy));
        let survivors: Vec<Image> = images
            .iter()
            .filter(|image| !deleted.contains(image.digest()))
            .cloned()
            .collect();

        prop_assert!(compute_deletion_set(&survivors, &policy).is_empty());
    }

    #[test]
    fn larger_keep_count_deletes_subset(
        images in arb_images(),
        count in 0u32..5,
        untagged in any::<bool>(),
    ) {
        let base = RetentionPolicy::new().with_delete_untagged(untagged);
        let narrow = base.clone().with_keep("release", count);
        let wide = base.with_keep("release", count + 1);

        let narrow_set = digest_set(&compute_deletion_set(&images, &narrow));
        for image in compute_deletion_set(&images, &wide) {
            prop_assert!(narrow_set.contains(image.digest()));
        }
    }

    #[test]
    fn lower_cap_deletes_superset(images in arb_images(), max in 2usize..30) {
        let base = RetentionPolicy::new().with_keep("release", 2);
        let loose = base.clone().with_max_images(cap(max));
        let tight = base.with_max_images(cap(max - 1));

        let tight_set = digest_set(&compute_deletion_set(&images, &tight));
        for image in compute_deletion_set(&images, &loose) {
            prop_assert!(tight_set.contains(image.digest()));
        }
    }
}
