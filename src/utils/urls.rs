//! 远端接口地址表
//!
//! 固定地址用常量,带令牌或随机参数的用构造函数。
//! Referer/Origin 必须与各接口所属代理页匹配,否则远端拒绝请求。

use rand::Rng;

/// 发送消息与信封共用的固定客户端标识
pub const CLIENT_ID: u64 = 53999199;

/// 登录握手准备页
pub const LOGIN_PREPARE: &str = "https://ui.ptlogin2.qq.com/cgi-bin/login?daid=164&target=self&style=16&mibao_css=m_webqq&appid=501004106&enable_qlogin=0&no_verifyimg=1&s_url=http%3A%2F%2Fw.qq.com%2Fproxy.html&f_url=loginerroralert&strong_login=1&login_state=10&t=20131024001";

/// 扫码状态轮询的Referer (与准备页相同)
pub const PTQRLOGIN_REFERER: &str = LOGIN_PREPARE;

/// 302捕获请求的Referer
pub const PTLOGIN4_REFERER: &str = "http://s.web2.qq.com/proxy.html?v=20130916001&callback=1&id=1";

/// s.web2 系接口的Referer
pub const S_REFERER: &str = "http://s.web2.qq.com/proxy.html?v=20130916001&callback=1&id=1";

/// s.web2 系接口的Origin
pub const S_ORIGIN: &str = "http://s.web2.qq.com";

/// d1.web2 系接口的Referer (login2/poll2/发送/在线状态)
pub const D_REFERER: &str = "http://d1.web2.qq.com/proxy.html?v=20151105001&callback=1&id=2";

/// d1.web2 系接口的Origin
pub const D_ORIGIN: &str = "http://d1.web2.qq.com";

/// 最终令牌交换
pub const LOGIN2: &str = "http://d1.web2.qq.com/channel/login2";

/// 长轮询接收端点
pub const POLL2: &str = "http://d1.web2.qq.com/channel/poll2";

/// 好友列表 (POST)
pub const GET_FRIENDS: &str = "http://s.web2.qq.com/api/get_user_friends2";

/// 群名单 (POST)
pub const GET_GROUPS: &str = "http://s.web2.qq.com/api/get_group_name_list_mask2";

/// 发送好友消息
pub const SEND_BUDDY_MSG: &str = "http://d1.web2.qq.com/channel/send_buddy_msg2";

/// 发送群消息
pub const SEND_GROUP_MSG: &str = "http://d1.web2.qq.com/channel/send_qun_msg2";

/// 发送讨论组消息
pub const SEND_DISCU_MSG: &str = "http://d1.web2.qq.com/channel/send_discu_msg2";

fn rand_t() -> f64 {
    rand::thread_rng().gen::<f64>()
}

/// 二维码图片
pub fn qrcode() -> String {
    format!(
        "https://ssl.ptlogin2.qq.com/ptqrshow?appid=501004106&e=0&l=M&s=5&d=72&v=4&t={}",
        rand_t()
    )
}

/// 扫码状态轮询
pub fn ptqrlogin(ptqrtoken: i64) -> String {
    format!(
        "https://ssl.ptlogin2.qq.com/ptqrlogin?ptqrtoken={}&webqq_type=10&remember_uin=1&login2qq=1&aid=501004106&u1=http%3A%2F%2Fw.qq.com%2Fproxy.html%3Flogin2qq%3D1%26webqq_type%3D10&ptredirect=0&ptlang=2052&daid=164&from_ui=1&pttype=1&dumy=&fp=loginerroralert&action=0-0-123332&mibao_css=m_webqq&t=undefined&g=1&js_type=0&js_ver=10141&login_sig=&pt_randsalt=0",
        ptqrtoken
    )
}

/// 第二级令牌交换
pub fn vfwebqq(ptwebqq: &str) -> String {
    format!(
        "http://s.web2.qq.com/api/getvfwebqq?ptwebqq={}&clientid={}&psessionid=&t={}",
        ptwebqq,
        CLIENT_ID,
        rand_t()
    )
}

/// 操作者个人资料
pub fn self_info() -> String {
    format!("http://s.web2.qq.com/api/get_self_info2?t={}", rand_t())
}

/// 在线状态列表
pub fn online_buddies(vfwebqq: &str, psessionid: &str) -> String {
    format!(
        "http://d1.web2.qq.com/channel/get_online_buddies2?vfwebqq={}&clientid={}&psessionid={}&t={}",
        vfwebqq,
        CLIENT_ID,
        psessionid,
        rand_t()
    )
}

/// 讨论组名单
pub fn discus_list(vfwebqq: &str, psessionid: &str) -> String {
    format!(
        "http://s.web2.qq.com/api/get_discus_list?clientid={}&psessionid={}&vfwebqq={}&t={}",
        CLIENT_ID,
        psessionid,
        vfwebqq,
        rand_t()
    )
}

/// 群详情 (按code查询)
pub fn group_detail(code: u64, vfwebqq: &str) -> String {
    format!(
        "http://s.web2.qq.com/api/get_group_info_ext2?gcode={}&vfwebqq={}&t={}",
        code,
        vfwebqq,
        rand_t()
    )
}

/// 讨论组详情
pub fn discu_detail(did: u64, vfwebqq: &str, psessionid: &str) -> String {
    format!(
        "http://d1.web2.qq.com/channel/get_discu_info?did={}&vfwebqq={}&clientid={}&psessionid={}&t={}",
        did,
        vfwebqq,
        CLIENT_ID,
        psessionid,
        rand_t()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_带随机参数的地址每次不同() {
        assert_ne!(qrcode(), qrcode());
    }

    #[test]
    fn test_ptqrlogin_包含令牌() {
        let url = ptqrlogin(12345);
        assert!(url.contains("ptqrtoken=12345"));
    }

    #[test]
    fn test_群详情地址按code构造() {
        let url = group_detail(987, "vf");
        assert!(url.contains("gcode=987"));
        assert!(url.contains("vfwebqq=vf"));
    }
}
