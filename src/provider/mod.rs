//! 提供方层：静态描述表、凭证来源、注册表与能力探测

pub mod credentials;
pub mod descriptor;
pub mod registry;

pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use descriptor::{ProviderDescriptor, ProviderId, DESCRIPTORS};
pub use registry::ProviderRegistry;
