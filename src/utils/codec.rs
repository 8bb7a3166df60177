//! 登录握手与花名册请求所需的编码函数
//!
//! 全部为纯函数,无状态:
//! - `rand_pgv`: 握手前种入cookie的随机跟踪值
//! - `ptqr_token`: 从 qrsig cookie 推导扫码轮询令牌 (hash33)
//! - `roster_hash`: 好友/群列表请求要求的 (uin, ptwebqq) 键控哈希

use rand::Rng;

/// 生成随机跟踪值
///
/// 对应页面埋点脚本里的 pgv_pvid 取值方式: 十位以内的随机整数字符串。
pub fn rand_pgv() -> String {
    let n: u64 = rand::thread_rng().gen_range(0..10_000_000_000);
    n.to_string()
}

/// 从 qrsig 推导 ptqrtoken
///
/// hash33: 逐字符累加 `e += (e << 5) + c`,最后与 0x7fffffff 取与。
pub fn ptqr_token(qrsig: &str) -> i64 {
    let mut e: i64 = 0;
    for c in qrsig.bytes() {
        e = e.wrapping_add((e << 5).wrapping_add(c as i64));
    }
    0x7fff_ffff & e
}

/// 花名册请求的键控哈希
///
/// 将 ptwebqq 按位异或折叠为4字节,与 uin 的4字节分别用
/// 'E','C','O','K' 加盐异或,交错拼接后输出大写十六进制。
pub fn roster_hash(uin: u64, ptwebqq: &str) -> String {
    let mut n = [0u64; 4];
    for (i, b) in ptwebqq.bytes().enumerate() {
        n[i % 4] ^= b as u64;
    }
    let salt = [b'E', b'C', b'O', b'K'];
    let v = [
        ((uin >> 24) & 255) ^ salt[0] as u64,
        ((uin >> 16) & 255) ^ salt[1] as u64,
        ((uin >> 8) & 255) ^ salt[2] as u64,
        (uin & 255) ^ salt[3] as u64,
    ];
    let mut interleaved = [0u64; 8];
    for (t, slot) in interleaved.iter_mut().enumerate() {
        *slot = if t % 2 == 0 { v[t >> 1] } else { n[t >> 1] };
    }
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(16);
    for c in interleaved {
        out.push(HEX[((c >> 4) & 15) as usize] as char);
        out.push(HEX[(c & 15) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_pgv_是纯数字() {
        let v = rand_pgv();
        assert!(!v.is_empty());
        assert!(v.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_ptqr_token_确定性() {
        assert_eq!(ptqr_token("abc"), ptqr_token("abc"));
        assert_ne!(ptqr_token("abc"), ptqr_token("abd"));
    }

    #[test]
    fn test_ptqr_token_非负() {
        assert!(ptqr_token("任意qrsig值") >= 0);
        assert_eq!(ptqr_token(""), 0);
    }

    #[test]
    fn test_roster_hash_形状() {
        let h = roster_hash(2685372057, "ptwebqq-value");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, h.to_uppercase());
    }

    #[test]
    fn test_roster_hash_对输入敏感() {
        let a = roster_hash(1000, "pt");
        assert_eq!(a, roster_hash(1000, "pt"));
        assert_ne!(a, roster_hash(1001, "pt"));
        assert_ne!(a, roster_hash(1000, "qt"));
    }
}
