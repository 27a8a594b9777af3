//! 提供方注册表与能力探测
//!
//! 注册表构造一次，以 Arc 共享给执行器、以引用交给路由器。每个提供方一个 `OnceLock` 槽位：
//! 首次探测或调用时检查配置与凭证，能构造则缓存客户端句柄，否则记为不可用。
//! 槽位只写一次；生成活动从不改变可用性。

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::config::{AppConfig, ProvidersSection};
use crate::llm::{
    create_deepseek_client, AnthropicClient, GeminiClient, LlmClient, LlmError, OpenAiClient,
};
use crate::provider::{CredentialSource, EnvCredentials, ProviderId};

type Slot = OnceLock<Option<Arc<dyn LlmClient>>>;

enum ClientSource {
    /// 按配置与凭证懒构造
    Configured {
        providers: ProvidersSection,
        credentials: Arc<dyn CredentialSource>,
    },
    /// 预先注入的客户端（测试替身等），未注入的提供方不可用
    Fixed,
}

pub struct ProviderRegistry {
    source: ClientSource,
    slots: BTreeMap<ProviderId, Slot>,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            source: ClientSource::Configured {
                providers: config.providers.clone(),
                credentials,
            },
            slots: empty_slots(),
        }
    }

    /// 凭证取自进程环境变量
    pub fn from_env(config: &AppConfig) -> Self {
        Self::from_config(config, Arc::new(EnvCredentials))
    }

    pub fn from_clients<I>(clients: I) -> Self
    where
        I: IntoIterator<Item = (ProviderId, Arc<dyn LlmClient>)>,
    {
        let mut slots = empty_slots();
        for (id, client) in clients {
            slots.insert(id, OnceLock::from(Some(client)));
        }
        Self {
            source: ClientSource::Fixed,
            slots,
        }
    }

    /// 取客户端句柄；首次访问时构造并缓存
    pub fn client(&self, id: ProviderId) -> Option<Arc<dyn LlmClient>> {
        self.slots
            .get(&id)
            .and_then(|slot| slot.get_or_init(|| self.construct(id)).clone())
    }

    pub fn is_available(&self, id: ProviderId) -> bool {
        self.client(id).is_some()
    }

    /// 探测所有提供方的可用性；结果缓存，重复调用幂等，从不报错
    pub fn probe(&self) -> BTreeMap<ProviderId, bool> {
        let availability: BTreeMap<ProviderId, bool> = ProviderId::ALL
            .iter()
            .map(|&id| (id, self.is_available(id)))
            .collect();
        tracing::info!(?availability, "provider probe");
        availability
    }

    /// 丢弃已缓存的探测结果并重新探测（配置来源的槽位；注入的客户端保持不变）
    pub fn reprobe(&mut self) -> BTreeMap<ProviderId, bool> {
        if matches!(self.source, ClientSource::Configured { .. }) {
            self.slots = empty_slots();
        }
        self.probe()
    }

    /// 当前可用的提供方（按 ProviderId::ALL 顺序）
    pub fn available(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .iter()
            .copied()
            .filter(|&id| self.is_available(id))
            .collect()
    }

    fn construct(&self, id: ProviderId) -> Option<Arc<dyn LlmClient>> {
        let ClientSource::Configured {
            providers,
            credentials,
        } = &self.source
        else {
            return None;
        };

        let section = providers.get(id);
        let descriptor = id.descriptor();
        if !section.enabled {
            tracing::debug!(provider = %id, "provider disabled by config");
            return None;
        }

        let key_env = section
            .api_key_env
            .as_deref()
            .unwrap_or(descriptor.api_key_env);
        let api_key = section
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| credentials.get(key_env));
        let Some(api_key) = api_key else {
            tracing::debug!(provider = %id, env = key_env, "provider skipped: no credential");
            return None;
        };

        let model = section.model.as_deref().unwrap_or(descriptor.default_model);
        let base_url = section.base_url.as_deref();
        let built: Result<Arc<dyn LlmClient>, LlmError> = match id {
            ProviderId::OpenAi => Ok(Arc::new(OpenAiClient::new(base_url, model, &api_key))),
            ProviderId::DeepSeek => Ok(Arc::new(create_deepseek_client(
                base_url,
                Some(model),
                &api_key,
            ))),
            ProviderId::Anthropic => AnthropicClient::new(base_url, model, &api_key)
                .map(|c| Arc::new(c) as Arc<dyn LlmClient>),
            ProviderId::Gemini => {
                GeminiClient::new(base_url, model, &api_key).map(|c| Arc::new(c) as Arc<dyn LlmClient>)
            }
        };

        match built {
            Ok(client) => {
                tracing::info!(provider = %id, model, "provider ready");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(provider = %id, error = %e, "provider client construction failed");
                None
            }
        }
    }
}

fn empty_slots() -> BTreeMap<ProviderId, Slot> {
    ProviderId::ALL.iter().map(|&id| (id, Slot::new())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::provider::StaticCredentials;

    #[test]
    fn test_probe_reports_only_credentialed_providers() {
        let credentials = StaticCredentials::new()
            .with("OPENAI_API_KEY", "sk-test")
            .with("GEMINI_API_KEY", "g-test")
            .with("DEEPSEEK_API_KEY", "   ");
        let registry = ProviderRegistry::from_config(&AppConfig::default(), Arc::new(credentials));

        let availability = registry.probe();
        assert_eq!(availability[&ProviderId::OpenAi], true);
        assert_eq!(availability[&ProviderId::Gemini], true);
        assert_eq!(availability[&ProviderId::Anthropic], false);
        assert_eq!(availability[&ProviderId::DeepSeek], false);
        assert_eq!(registry.available(), vec![ProviderId::OpenAi, ProviderId::Gemini]);
    }

    #[test]
    fn test_disabled_provider_is_unavailable() {
        let mut config = AppConfig::default();
        config.providers.openai.enabled = false;
        let credentials = StaticCredentials::new().with("OPENAI_API_KEY", "sk-test");
        let registry = ProviderRegistry::from_config(&config, Arc::new(credentials));
        assert!(!registry.is_available(ProviderId::OpenAi));
    }

    #[test]
    fn test_key_env_override_and_inline_key() {
        let mut config = AppConfig::default();
        config.providers.anthropic.api_key_env = Some("TEAM_CLAUDE_KEY".into());
        config.providers.deepseek.api_key = Some("inline-key".into());
        let credentials = StaticCredentials::new().with("TEAM_CLAUDE_KEY", "k");
        let registry = ProviderRegistry::from_config(&config, Arc::new(credentials));

        assert!(registry.is_available(ProviderId::Anthropic));
        assert!(registry.is_available(ProviderId::DeepSeek));
        assert_eq!(registry.client(ProviderId::DeepSeek).unwrap().model(), "deepseek-chat");
    }

    #[test]
    fn test_probe_is_idempotent() {
        let credentials = StaticCredentials::new().with("GEMINI_API_KEY", "g");
        let mut registry =
            ProviderRegistry::from_config(&AppConfig::default(), Arc::new(credentials));
        let first = registry.probe();
        assert_eq!(registry.probe(), first);
        assert_eq!(registry.reprobe(), first);
    }

    #[test]
    fn test_cached_handle_is_shared() {
        let credentials = StaticCredentials::new().with("GEMINI_API_KEY", "g");
        let registry = ProviderRegistry::from_config(&AppConfig::default(), Arc::new(credentials));
        let a = registry.client(ProviderId::Gemini).unwrap();
        let b = registry.client(ProviderId::Gemini).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_from_clients_only_exposes_injected() {
        let mock: Arc<dyn LlmClient> = Arc::new(MockLlmClient::echo());
        let mut registry = ProviderRegistry::from_clients([(ProviderId::Anthropic, mock)]);
        assert_eq!(registry.available(), vec![ProviderId::Anthropic]);
        registry.reprobe();
        assert!(registry.is_available(ProviderId::Anthropic));
    }
}
