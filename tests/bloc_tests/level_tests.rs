use std::cmp::Ordering;

use blocstack::bloc::{level_for_size, Bloc};
use blocstack::digest::compare;
use blocstack::{BlocError, Digest};
use proptest::prelude::*;

// =============================================================================
// Digest ordering
// =============================================================================

#[test]
fn test_compare_first_differing_byte_decides() {
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    a[5] = 0x80;
    b[5] = 0x7f;
    b[31] = 0xff;
    assert_eq!(compare(&a, &b).unwrap(), Ordering::Greater);
    assert_eq!(compare(&b, &a).unwrap(), Ordering::Less);
    assert_eq!(compare(&a, &a).unwrap(), Ordering::Equal);
}

#[test]
fn test_compare_rejects_wrong_width() {
    assert!(matches!(
        compare(&[0u8; 31], &[0u8; 32]),
        Err(BlocError::DigestWidth(31))
    ));
    assert!(matches!(
        compare(&[0u8; 32], &[0u8; 33]),
        Err(BlocError::DigestWidth(33))
    ));
}

proptest! {
    #[test]
    fn prop_compare_antisymmetric(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
        let ab = compare(&a, &b).unwrap();
        let ba = compare(&b, &a).unwrap();
        prop_assert_eq!(ab, ba.reverse());
        prop_assert_eq!(ab == Ordering::Equal, a == b);
    }

    #[test]
    fn prop_compare_matches_digest_ord(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
        prop_assert_eq!(compare(&a, &b).unwrap(), Digest::new(a).cmp(&Digest::new(b)));
    }
}

// =============================================================================
// Levels
// =============================================================================

#[test]
fn test_empty_has_no_level() {
    assert!(matches!(level_for_size(0), Err(BlocError::EmptyBloc)));
}

#[test]
fn test_bloc_level_follows_size() {
    let digests: Vec<Digest> = (0..5u8).map(|n| Digest::new([n; 32])).collect();
    let bloc = Bloc::from_digests(&digests);
    assert_eq!(bloc.len(), 5);
    assert_eq!(bloc.level().unwrap(), 3);
}

proptest! {
    #[test]
    fn prop_level_is_smallest_power_covering_size(size in 1usize..1_000_000) {
        let level = level_for_size(size).unwrap();
        prop_assert!(size as u128 <= 1u128 << level);
        if level > 0 {
            prop_assert!(size as u128 > 1u128 << (level - 1));
        }
    }
}
