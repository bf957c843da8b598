use std::collections::BTreeSet;

use crate::bucket::hash_futex;
use crate::config::{FUTEX_HASH_BITS, FUTEX_HASH_SIZE, PAGE_SIZE};
use crate::jhash::{hash_long, jhash2};
use crate::key::FutexKey;

const MM_ID: usize = 0x5555_0000_1230;

fn private_key(page: usize, offset: u32) -> FutexKey {
    FutexKey::Private {
        mm: MM_ID,
        page,
        offset,
    }
}

#[test]
fn test_jhash2_deterministic() {
    let words = [1u32, 2, 3, 4, 5];
    assert_eq!(jhash2(&words, 0), jhash2(&words, 0));
    assert_ne!(jhash2(&words, 0), jhash2(&words, 4));
    assert_ne!(jhash2(&words[..3], 0), jhash2(&words[..4], 0));
}

#[test]
fn test_jhash2_short_inputs() {
    // 长度为 0/1/2 的尾部都要参与混合
    let empty = jhash2(&[], 0);
    let one = jhash2(&[7], 0);
    let two = jhash2(&[7, 9], 0);
    assert_ne!(empty, one);
    assert_ne!(one, two);
}

#[test]
fn test_hash_long_range() {
    for val in [0u64, 1, 0xdead_beef, u64::MAX, 0x9e37_79b9_7f4a_7c15] {
        assert!(hash_long(val, FUTEX_HASH_BITS) < FUTEX_HASH_SIZE);
    }
    assert_eq!(hash_long(0, FUTEX_HASH_BITS), 0);
}

#[test]
fn test_hash_futex_spreads_pages() {
    let buckets: BTreeSet<usize> = (0..1024)
        .map(|i| hash_futex(&private_key(0x1000_0000 + i * PAGE_SIZE, 0)))
        .collect();
    assert!(buckets.len() >= 200, "only {} buckets used", buckets.len());
}

#[test]
fn test_hash_futex_spreads_offsets() {
    let buckets: BTreeSet<usize> = (0..PAGE_SIZE as u32)
        .step_by(4)
        .map(|offset| hash_futex(&private_key(0x1000_0000, offset)))
        .collect();
    assert!(buckets.len() >= 200, "only {} buckets used", buckets.len());
}

#[test]
fn test_equal_keys_share_bucket() {
    let a = FutexKey::Shared {
        inode: 0xffff_8000_0000_1000,
        pgoff: 3,
        offset: 8,
    };
    let b = a;
    assert_eq!(hash_futex(&a), hash_futex(&b));
}

#[test]
fn test_hash_words_layout() {
    let key = FutexKey::Shared {
        inode: 0x1_0000_0002,
        pgoff: 0x3_0000_0004,
        offset: 12,
    };
    assert_eq!(key.hash_words(), [1, 2, 1, 4, 3]);
    assert!(key.is_shared());
    assert_eq!(key.offset(), 12);

    let key = private_key(0x2000, 4);
    assert_eq!(key.hash_words()[0], 0);
    assert!(!key.is_shared());
}

#[test]
fn test_private_and_shared_keys_differ() {
    let private = FutexKey::Private {
        mm: 0x1000,
        page: 0x2000,
        offset: 0,
    };
    let shared = FutexKey::Shared {
        inode: 0x1000,
        pgoff: 0x2000,
        offset: 0,
    };
    assert_ne!(private, shared);
    assert_ne!(private.hash_words(), shared.hash_words());
}
