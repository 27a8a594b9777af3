//! 任务路由器
//!
//! 根据任务类别给出提供方偏好顺序：
//! - 推理 / 代码 / 分析：能力最强的模型优先
//! - 结构化元数据 / 创意：低延迟模型优先
//! - 调用方指定的首选提供方若可用则排第一
//!
//! 偏好表是一张显式数据表（类别 -> 有序提供方列表），可由配置覆盖，测试可直接断言。

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::provider::{ProviderId, ProviderRegistry};

/// 任务类别（用于路由决策）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    /// 复杂推理
    Reasoning,
    /// 正文内容生成
    Content,
    /// 元数据 / SEO 类结构化生成
    Metadata,
    /// 代码生成
    Code,
    /// 分析评估
    Analysis,
    /// 创意写作
    Creative,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 6] = [
        TaskCategory::Reasoning,
        TaskCategory::Content,
        TaskCategory::Metadata,
        TaskCategory::Code,
        TaskCategory::Analysis,
        TaskCategory::Creative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Reasoning => "reasoning",
            TaskCategory::Content => "content",
            TaskCategory::Metadata => "metadata",
            TaskCategory::Code => "code",
            TaskCategory::Analysis => "analysis",
            TaskCategory::Creative => "creative",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reasoning" => Ok(TaskCategory::Reasoning),
            "content" => Ok(TaskCategory::Content),
            "metadata" | "seo" => Ok(TaskCategory::Metadata),
            "code" => Ok(TaskCategory::Code),
            "analysis" => Ok(TaskCategory::Analysis),
            "creative" => Ok(TaskCategory::Creative),
            other => Err(format!("unknown task category: {other}")),
        }
    }
}

/// 类别 -> 默认偏好顺序
#[derive(Debug, Clone)]
pub struct RoutingTable {
    orders: HashMap<TaskCategory, Vec<ProviderId>>,
}

impl RoutingTable {
    /// 用覆盖项替换对应类别的顺序；覆盖列表中的重复项只保留第一次出现
    pub fn with_overrides(mut self, overrides: &HashMap<TaskCategory, Vec<ProviderId>>) -> Self {
        for (category, order) in overrides {
            let mut deduped = Vec::with_capacity(order.len());
            for provider in order {
                if !deduped.contains(provider) {
                    deduped.push(*provider);
                }
            }
            self.orders.insert(*category, deduped);
        }
        self
    }

    pub fn order(&self, category: TaskCategory) -> &[ProviderId] {
        self.orders.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        use ProviderId::*;
        let orders = HashMap::from([
            (TaskCategory::Reasoning, vec![Anthropic, OpenAi, DeepSeek, Gemini]),
            (TaskCategory::Content, vec![OpenAi, Anthropic, Gemini, DeepSeek]),
            (TaskCategory::Metadata, vec![Gemini, OpenAi, DeepSeek, Anthropic]),
            (TaskCategory::Code, vec![Anthropic, DeepSeek, OpenAi, Gemini]),
            (TaskCategory::Analysis, vec![Anthropic, OpenAi, Gemini, DeepSeek]),
            (TaskCategory::Creative, vec![OpenAi, Gemini, Anthropic, DeepSeek]),
        ]);
        Self { orders }
    }
}

/// 路由结果：当前可用提供方的有序排列（无重复）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub category: TaskCategory,
    pub providers: Vec<ProviderId>,
    /// 预期首选（指定的首选提供方，或默认顺序第一位）不在列表首位
    pub degraded: bool,
}

impl Route {
    pub fn providers(&self) -> &[ProviderId] {
        &self.providers
    }
}

impl Deref for Route {
    type Target = [ProviderId];

    fn deref(&self) -> &Self::Target {
        &self.providers
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRouter {
    table: RoutingTable,
}

impl TaskRouter {
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// 按注册表当前可用性路由；无可用提供方时返回空列表
    pub fn route(
        &self,
        registry: &ProviderRegistry,
        category: TaskCategory,
        preferred: Option<ProviderId>,
    ) -> Route {
        self.route_with(category, preferred, |p| registry.is_available(p))
    }

    /// 与 route 相同，可用性由调用方给出
    pub fn route_with(
        &self,
        category: TaskCategory,
        preferred: Option<ProviderId>,
        is_available: impl Fn(ProviderId) -> bool,
    ) -> Route {
        let default_order = self.table.order(category);
        let intended_first = preferred.or_else(|| default_order.first().copied());

        let mut providers: Vec<ProviderId> = Vec::with_capacity(default_order.len() + 1);
        if let Some(p) = preferred {
            if is_available(p) {
                providers.push(p);
            } else {
                tracing::warn!(provider = %p, task = %category, "preferred provider unavailable, using default order");
            }
        }
        for &p in default_order {
            if !providers.contains(&p) && is_available(p) {
                providers.push(p);
            }
        }

        let degraded = match intended_first {
            Some(first) => providers.first() != Some(&first),
            None => false,
        };
        tracing::debug!(task = %category, ?providers, degraded, "route computed");

        Route {
            category,
            providers,
            degraded,
        }
    }
}
