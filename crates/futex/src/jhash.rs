//! Bob Jenkins 的 lookup2 哈希（Linux `jhash.h` 的 `jhash2`）与乘法折叠

/// lookup2 的初始常量（黄金分割比）
const JHASH_GOLDEN_RATIO: u32 = 0x9e37_79b9;

/// 64 位乘法哈希使用的素数，接近 2^64 的黄金分割点
const GOLDEN_RATIO_PRIME_64: u64 = 0x9e37_ffff_fffc_0001;

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
}

/// 对 32 位字数组求哈希，`initval` 作为区分不同输入族的扰动
pub fn jhash2(k: &[u32], initval: u32) -> u32 {
    let mut a = JHASH_GOLDEN_RATIO;
    let mut b = JHASH_GOLDEN_RATIO;
    let mut c = initval;

    let mut chunks = k.chunks_exact(3);
    for w in &mut chunks {
        a = a.wrapping_add(w[0]);
        b = b.wrapping_add(w[1]);
        c = c.wrapping_add(w[2]);
        mix(&mut a, &mut b, &mut c);
    }

    c = c.wrapping_add((k.len() as u32).wrapping_mul(4));
    let rest = chunks.remainder();
    if rest.len() == 2 {
        b = b.wrapping_add(rest[1]);
    }
    if !rest.is_empty() {
        a = a.wrapping_add(rest[0]);
    }
    mix(&mut a, &mut b, &mut c);

    c
}

/// 把哈希值折叠为 `bits` 位（取乘积的高位）
pub fn hash_long(val: u64, bits: u32) -> usize {
    debug_assert!(bits > 0 && bits < 64);
    (val.wrapping_mul(GOLDEN_RATIO_PRIME_64) >> (64 - bits)) as usize
}
