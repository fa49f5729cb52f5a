//! Memory sizing of the gateway collector derived from the cluster wide settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_REQUEST_MEMORY_MIB: u32 = 500;
/// Headroom between the memory request and the point the memory limiter starts refusing data.
const DEFAULT_MEMORY_LIMITER_LIMIT_DIFF_MIB: u32 = 50;
const DEFAULT_MEMORY_LIMITER_SPIKE_PERCENTAGE: u32 = 20;
const DEFAULT_GO_MEM_LIMIT_PERCENTAGE: u32 = 80;
const MEMORY_LIMITER_CHECK_INTERVAL: &str = "1s";
const MIN_MEMORY_MIB: u32 = 1;

/// Gateway related values of the cluster settings. Every value is optional and derived from
/// the memory request when absent.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct CollectorGatewaySettings {
    #[serde(default, rename = "requestMemoryMiB", skip_serializing_if = "Option::is_none")]
    pub request_memory_mib: Option<u32>,
    #[serde(default, rename = "limitMemoryMiB", skip_serializing_if = "Option::is_none")]
    pub limit_memory_mib: Option<u32>,
    #[serde(default, rename = "memoryLimiterLimitMiB", skip_serializing_if = "Option::is_none")]
    pub memory_limiter_limit_mib: Option<u32>,
    #[serde(default, rename = "memoryLimiterSpikeLimitMiB", skip_serializing_if = "Option::is_none")]
    pub memory_limiter_spike_limit_mib: Option<u32>,
    #[serde(default, rename = "goMemLimitMiB", skip_serializing_if = "Option::is_none")]
    pub go_mem_limit_mib: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySizing {
    pub request_memory_mib: u32,
    pub limit_memory_mib: u32,
    pub memory_limiter_limit_mib: u32,
    pub memory_limiter_spike_limit_mib: u32,
    pub go_mem_limit_mib: u32,
}

impl GatewaySizing {
    pub fn from_settings(settings: &CollectorGatewaySettings) -> Self {
        let request_memory_mib = settings
            .request_memory_mib
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_REQUEST_MEMORY_MIB);
        let limit_memory_mib = settings
            .limit_memory_mib
            .filter(|v| *v > 0)
            .unwrap_or(request_memory_mib.saturating_mul(5) / 4);
        // The limiter never drops under half of the request.
        let memory_limiter_limit_mib = settings
            .memory_limiter_limit_mib
            .filter(|v| *v > 0)
            .unwrap_or(
                request_memory_mib
                    .saturating_sub(DEFAULT_MEMORY_LIMITER_LIMIT_DIFF_MIB)
                    .max(request_memory_mib / 2)
                    .max(MIN_MEMORY_MIB),
            );
        let memory_limiter_spike_limit_mib = settings
            .memory_limiter_spike_limit_mib
            .filter(|v| *v > 0)
            .unwrap_or(
                percentage(memory_limiter_limit_mib, DEFAULT_MEMORY_LIMITER_SPIKE_PERCENTAGE)
                    .max(MIN_MEMORY_MIB),
            );
        let go_mem_limit_mib = settings
            .go_mem_limit_mib
            .filter(|v| *v > 0)
            .unwrap_or(
                percentage(memory_limiter_limit_mib, DEFAULT_GO_MEM_LIMIT_PERCENTAGE)
                    .max(MIN_MEMORY_MIB),
            );

        Self {
            request_memory_mib,
            limit_memory_mib,
            memory_limiter_limit_mib,
            memory_limiter_spike_limit_mib,
            go_mem_limit_mib,
        }
    }

    /// Configuration of the `memory_limiter` processor placed first in every pipeline.
    pub fn memory_limiter(&self) -> serde_json::Value {
        json!({
            "check_interval": MEMORY_LIMITER_CHECK_INTERVAL,
            "limit_mib": self.memory_limiter_limit_mib,
            "spike_limit_mib": self.memory_limiter_spike_limit_mib,
        })
    }

    /// Value for the `GOMEMLIMIT` environment variable of the collector.
    pub fn go_mem_limit(&self) -> String {
        format!("{}MiB", self.go_mem_limit_mib)
    }
}

impl Default for GatewaySizing {
    fn default() -> Self {
        Self::from_settings(&CollectorGatewaySettings::default())
    }
}

fn percentage(value: u32, percent: u32) -> u32 {
    value.saturating_mul(percent) / 100
}
