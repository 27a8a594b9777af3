//! 凭证来源：编排器只读取，不写入也不管理

use std::collections::HashMap;

pub trait CredentialSource: Send + Sync {
    /// 读取指定名称的凭证；未设置或为空时返回 None
    fn get(&self, name: &str) -> Option<String>;
}

/// 从进程环境变量读取
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// 固定凭证表（测试 / 嵌入场景）
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials(HashMap<String, String>);

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}
