use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::errors::ApiError;
use crate::models::peer::{DiscuDetail, Discussion, Group, GroupDetail, PeerKind};
use crate::models::wire::{
    DiscuDetailResult, DiscuListResult, FriendsResult, GroupDetailResult, GroupListResult,
    OnlineBuddy, SelfInfo,
};
use crate::models::Buddy;
use crate::services::http_client::{HttpClient, HttpRequest};
use crate::services::session::Session;
use crate::utils::{codec, urls};

/// 名称解析缓存的键
///
/// 两级: 对端本身,或容器内的成员。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKey {
    Buddy(u64),
    Group(u64),
    Discu(u64),
    /// (群gid或code, 成员uin)
    GroupMember(u64, u64),
    /// (讨论组did, 成员uin)
    DiscuMember(u64, u64),
}

impl NameKey {
    /// 该键隶属的对端类型
    fn variant(&self) -> PeerKind {
        match self {
            NameKey::Buddy(_) => PeerKind::Buddy,
            NameKey::Group(_) | NameKey::GroupMember(_, _) => PeerKind::Group,
            NameKey::Discu(_) | NameKey::DiscuMember(_, _) => PeerKind::Discu,
        }
    }
}

/// 名称解析的记忆化缓存
///
/// 不变量: 某个集合重载后,命中其旧条目的缓存必须同时失效。
/// 因此 `clear_variant` 精确清除该对端类型名下的全部键,不动其它类型。
#[derive(Debug, Default)]
pub struct NameCache {
    map: HashMap<NameKey, String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NameKey) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn insert(&mut self, key: NameKey, name: String) {
        self.map.insert(key, name);
    }

    /// 清除某个对端类型名下的全部条目
    pub fn clear_variant(&mut self, kind: PeerKind) {
        self.map.retain(|key, _| key.variant() != kind);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Default)]
struct RosterInner {
    self_info: Option<SelfInfo>,
    buddies: Vec<Buddy>,
    groups: Vec<Group>,
    discus: Vec<Discussion>,
    online: Vec<OnlineBuddy>,
    names: NameCache,
}

/// 花名册缓存
///
/// 持有三类对端集合与名称解析缓存,是它们的唯一属主。
/// 集合在登录后批量填充,按需或定时整体替换(不做合并);
/// 群/讨论组的成员详情块懒加载。
pub struct Roster {
    client: Arc<HttpClient>,
    session: Arc<Session>,
    inner: RwLock<RosterInner>,
}

impl Roster {
    pub fn new(client: Arc<HttpClient>, session: Arc<Session>) -> Self {
        Self {
            client,
            session,
            inner: RwLock::new(RosterInner::default()),
        }
    }

    // ------------------------------------------------------------------
    // 集合加载 (每个方法一次认证请求,整体替换对应集合)
    // ------------------------------------------------------------------

    /// 操作者个人资料
    pub async fn load_self(&self) -> Result<(), ApiError> {
        self.session.require_auth()?;
        let url = urls::self_info();
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::S_REFERER))
            .await?;
        let info: SelfInfo = response.result_as()?;
        tracing::debug!(uin = info.uin, nick = %info.nick, "个人资料已加载");
        self.inner.write().await.self_info = Some(info);
        Ok(())
    }

    /// 好友列表 (昵称+备注名合并)
    pub async fn load_buddies(&self) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let payload = serde_json::json!({
            "vfwebqq": tokens.vfwebqq,
            "hash": codec::roster_hash(tokens.uin, &tokens.ptwebqq),
        })
        .to_string();
        let response = self
            .client
            .post_form(
                HttpRequest::new(urls::GET_FRIENDS)
                    .referer(urls::S_REFERER)
                    .origin(urls::S_ORIGIN),
                &[("r", &payload)],
            )
            .await?;
        let result: FriendsResult = response.result_as()?;

        let marknames: HashMap<u64, String> = result
            .marknames
            .into_iter()
            .map(|m| (m.uin, m.markname))
            .collect();
        let buddies: Vec<Buddy> = result
            .info
            .into_iter()
            .map(|entry| Buddy {
                markname: marknames.get(&entry.uin).cloned(),
                uin: entry.uin,
                nick: entry.nick,
            })
            .collect();

        tracing::info!(count = buddies.len(), "好友列表已加载");
        let mut inner = self.inner.write().await;
        inner.buddies = buddies;
        inner.names.clear_variant(PeerKind::Buddy);
        Ok(())
    }

    /// 在线状态列表
    pub async fn load_online(&self) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let url = urls::online_buddies(&tokens.vfwebqq, &tokens.psessionid);
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::D_REFERER))
            .await?;
        let online: Vec<OnlineBuddy> = response.result_as()?;
        tracing::debug!(count = online.len(), "在线状态已加载");
        self.inner.write().await.online = online;
        Ok(())
    }

    /// 群名单
    pub async fn load_groups(&self) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let payload = serde_json::json!({
            "vfwebqq": tokens.vfwebqq,
            "hash": codec::roster_hash(tokens.uin, &tokens.ptwebqq),
        })
        .to_string();
        let response = self
            .client
            .post_form(
                HttpRequest::new(urls::GET_GROUPS)
                    .referer(urls::S_REFERER)
                    .origin(urls::S_ORIGIN),
                &[("r", &payload)],
            )
            .await?;
        let result: GroupListResult = response.result_as()?;
        let groups: Vec<Group> = result
            .gnamelist
            .into_iter()
            .map(|entry| Group {
                gid: entry.gid,
                code: entry.code,
                name: entry.name,
                detail: None,
            })
            .collect();

        tracing::info!(count = groups.len(), "群名单已加载");
        let mut inner = self.inner.write().await;
        inner.groups = groups;
        inner.names.clear_variant(PeerKind::Group);
        Ok(())
    }

    /// 讨论组名单
    pub async fn load_discus(&self) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let url = urls::discus_list(&tokens.vfwebqq, &tokens.psessionid);
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::S_REFERER))
            .await?;
        let result: DiscuListResult = response.result_as()?;
        let discus: Vec<Discussion> = result
            .dnamelist
            .into_iter()
            .map(|entry| Discussion {
                did: entry.did,
                name: entry.name,
                detail: None,
            })
            .collect();

        tracing::info!(count = discus.len(), "讨论组名单已加载");
        let mut inner = self.inner.write().await;
        inner.discus = discus;
        inner.names.clear_variant(PeerKind::Discu);
        Ok(())
    }

    /// 登录后的初始填充: 五个集合无序依赖,并发拉取后汇合
    pub async fn init(&self) -> Result<(), ApiError> {
        futures::try_join!(
            self.load_self(),
            self.load_buddies(),
            self.load_online(),
            self.load_groups(),
            self.load_discus(),
        )?;
        Ok(())
    }

    /// 定时刷新走与初始填充相同的变更路径,保证缓存失效一致
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.init().await
    }

    /// 拉取单个群的详情块 (按code)
    pub async fn load_group_detail(&self, code: u64) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let url = urls::group_detail(code, &tokens.vfwebqq);
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::S_REFERER))
            .await?;
        let result: GroupDetailResult = response.result_as()?;

        let detail = GroupDetail {
            nicks: result.minfo.into_iter().map(|m| (m.uin, m.nick)).collect(),
            cards: result.cards.into_iter().map(|c| (c.muin, c.card)).collect(),
        };
        let mut inner = self.inner.write().await;
        if let Some(group) = inner.groups.iter_mut().find(|g| g.code == code) {
            tracing::debug!(code, members = detail.nicks.len(), "群详情已加载");
            group.detail = Some(detail);
        }
        Ok(())
    }

    /// 拉取单个讨论组的成员列表
    pub async fn load_discu_detail(&self, did: u64) -> Result<(), ApiError> {
        let tokens = self.session.require_auth()?;
        let url = urls::discu_detail(did, &tokens.vfwebqq, &tokens.psessionid);
        let response = self
            .client
            .get_json(HttpRequest::new(&url).referer(urls::D_REFERER))
            .await?;
        let result: DiscuDetailResult = response.result_as()?;

        let detail = DiscuDetail {
            nicks: result
                .mem_info
                .into_iter()
                .map(|m| (m.uin, m.nick))
                .collect(),
        };
        let mut inner = self.inner.write().await;
        if let Some(discu) = inner.discus.iter_mut().find(|d| d.did == did) {
            tracing::debug!(did, members = detail.nicks.len(), "讨论组详情已加载");
            discu.detail = Some(detail);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // 名称解析 (先查缓存,未命中按优先序扫描,找不到回退原始id)
    // ------------------------------------------------------------------

    /// 好友显示名: 备注名优先于昵称
    pub async fn resolve_buddy_name(&self, uin: u64) -> String {
        let key = NameKey::Buddy(uin);
        if let Some(hit) = self.inner.read().await.names.get(&key) {
            return hit;
        }
        let mut inner = self.inner.write().await;
        let name = inner
            .buddies
            .iter()
            .find(|b| b.uin == uin)
            .map(|b| b.display_name().to_string())
            .unwrap_or_else(|| uin.to_string());
        inner.names.insert(key, name.clone());
        name
    }

    /// 群显示名 (gid与code都可作为查询键)
    pub async fn resolve_group_name(&self, gid_or_code: u64) -> String {
        let key = NameKey::Group(gid_or_code);
        if let Some(hit) = self.inner.read().await.names.get(&key) {
            return hit;
        }
        let mut inner = self.inner.write().await;
        let name = inner
            .groups
            .iter()
            .find(|g| g.gid == gid_or_code || g.code == gid_or_code)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| gid_or_code.to_string());
        inner.names.insert(key, name.clone());
        name
    }

    /// 讨论组显示名
    pub async fn resolve_discu_name(&self, did: u64) -> String {
        let key = NameKey::Discu(did);
        if let Some(hit) = self.inner.read().await.names.get(&key) {
            return hit;
        }
        let mut inner = self.inner.write().await;
        let name = inner
            .discus
            .iter()
            .find(|d| d.did == did)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| did.to_string());
        inner.names.insert(key, name.clone());
        name
    }

    /// 群内成员显示名: 群名片优先于昵称
    ///
    /// 详情块缺失时按code拉取一次;仍找不到的成员按操作者
    /// 本人处理 (返回自己的显示名),否则回退原始id。
    pub async fn resolve_member_in_group(&self, uin: u64, gid_or_code: u64) -> String {
        let key = NameKey::GroupMember(gid_or_code, uin);
        if let Some(hit) = self.inner.read().await.names.get(&key) {
            return hit;
        }

        let need_fetch = {
            let inner = self.inner.read().await;
            inner
                .groups
                .iter()
                .find(|g| g.gid == gid_or_code || g.code == gid_or_code)
                .and_then(|g| if g.detail.is_none() { Some(g.code) } else { None })
        };
        if let Some(code) = need_fetch {
            if let Err(e) = self.load_group_detail(code).await {
                tracing::warn!(code, error = %e, "群详情拉取失败,使用回退名称");
            }
        }

        let mut inner = self.inner.write().await;
        let found = inner
            .groups
            .iter()
            .find(|g| g.gid == gid_or_code || g.code == gid_or_code)
            .and_then(|g| g.detail.as_ref())
            .and_then(|d| d.member_name(uin))
            .map(String::from);
        let name = found.unwrap_or_else(|| self.fallback_name(&inner, uin));
        inner.names.insert(key, name.clone());
        name
    }

    /// 讨论组内成员显示名
    pub async fn resolve_member_in_discu(&self, uin: u64, did: u64) -> String {
        let key = NameKey::DiscuMember(did, uin);
        if let Some(hit) = self.inner.read().await.names.get(&key) {
            return hit;
        }

        let need_fetch = {
            let inner = self.inner.read().await;
            inner
                .discus
                .iter()
                .find(|d| d.did == did)
                .map_or(false, |d| d.detail.is_none())
        };
        if need_fetch {
            if let Err(e) = self.load_discu_detail(did).await {
                tracing::warn!(did, error = %e, "讨论组详情拉取失败,使用回退名称");
            }
        }

        let mut inner = self.inner.write().await;
        let found = inner
            .discus
            .iter()
            .find(|d| d.did == did)
            .and_then(|d| d.detail.as_ref())
            .and_then(|detail| detail.nicks.get(&uin))
            .cloned();
        let name = found.unwrap_or_else(|| self.fallback_name(&inner, uin));
        inner.names.insert(key, name.clone());
        name
    }

    /// 成员查不到时的回退
    ///
    /// 假定未命中的成员是操作者本人 (成员表不含自己),返回自己的
    /// 显示名;uin对不上时退回原始id。该假定未经远端全部响应形状
    /// 验证,由测试固化现有行为。
    fn fallback_name(&self, inner: &RosterInner, uin: u64) -> String {
        let self_uin = self.session.tokens().uin;
        if uin == self_uin {
            if let Some(info) = &inner.self_info {
                return info.nick.clone();
            }
        }
        uin.to_string()
    }
}
