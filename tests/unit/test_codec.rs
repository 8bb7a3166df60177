//! 编码函数的公开API测试

use qq_bot::utils::codec::{ptqr_token, rand_pgv, roster_hash};

#[test]
fn test_ptqr_token_已知输入() {
    // hash33手算: "abc" -> 108966
    assert_eq!(ptqr_token("abc"), 108966);
    assert_eq!(ptqr_token(""), 0);
}

#[test]
fn test_ptqr_token_长输入不溢出() {
    let long = "x".repeat(4096);
    let token = ptqr_token(&long);
    assert!(token >= 0);
    assert!(token <= 0x7fff_ffff);
}

#[test]
fn test_rand_pgv_十位以内数字() {
    for _ in 0..100 {
        let v = rand_pgv();
        assert!(v.len() <= 10);
        assert!(v.parse::<u64>().unwrap() < 10_000_000_000);
    }
}

#[test]
fn test_roster_hash_稳定且区分输入() {
    let h = roster_hash(2685372057, "AbCdEf");
    assert_eq!(h.len(), 16);
    assert_eq!(h, roster_hash(2685372057, "AbCdEf"));
    assert_ne!(h, roster_hash(2685372058, "AbCdEf"));
    assert_ne!(h, roster_hash(2685372057, "AbCdEg"));
    assert!(h.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_lowercase()));
}
