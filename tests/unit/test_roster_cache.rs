//! 名称缓存失效粒度的公开API测试

use qq_bot::models::PeerKind;
use qq_bot::services::{NameCache, NameKey};

fn seeded() -> NameCache {
    let mut cache = NameCache::new();
    cache.insert(NameKey::Buddy(1), "好友".to_string());
    cache.insert(NameKey::Group(2), "群".to_string());
    cache.insert(NameKey::GroupMember(2, 3), "群成员".to_string());
    cache.insert(NameKey::Discu(4), "讨论组".to_string());
    cache.insert(NameKey::DiscuMember(4, 5), "讨论组成员".to_string());
    cache
}

#[test]
fn test_清好友只动好友条目() {
    let mut cache = seeded();
    cache.clear_variant(PeerKind::Buddy);
    assert_eq!(cache.len(), 4);
    assert!(cache.get(&NameKey::Buddy(1)).is_none());
    assert!(cache.get(&NameKey::Group(2)).is_some());
    assert!(cache.get(&NameKey::GroupMember(2, 3)).is_some());
}

#[test]
fn test_清群连带群成员() {
    let mut cache = seeded();
    cache.clear_variant(PeerKind::Group);
    assert_eq!(cache.len(), 3);
    assert!(cache.get(&NameKey::Group(2)).is_none());
    assert!(cache.get(&NameKey::GroupMember(2, 3)).is_none());
    assert!(cache.get(&NameKey::Discu(4)).is_some());
    assert!(cache.get(&NameKey::DiscuMember(4, 5)).is_some());
}

#[test]
fn test_清讨论组连带讨论组成员() {
    let mut cache = seeded();
    cache.clear_variant(PeerKind::Discu);
    assert_eq!(cache.len(), 3);
    assert!(cache.get(&NameKey::Discu(4)).is_none());
    assert!(cache.get(&NameKey::DiscuMember(4, 5)).is_none());
    assert!(cache.get(&NameKey::Buddy(1)).is_some());
}

#[test]
fn test_同键覆盖写() {
    let mut cache = NameCache::new();
    cache.insert(NameKey::Buddy(1), "旧名".to_string());
    cache.insert(NameKey::Buddy(1), "新名".to_string());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&NameKey::Buddy(1)).unwrap(), "新名");
}
