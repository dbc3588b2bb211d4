use std::collections::BTreeMap;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::utils::warn_once;

/// Per-million-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Input cost per 1M tokens
    pub input_per_1m: f64,
    /// Output cost per 1M tokens
    pub output_per_1m: f64,
}

impl ModelPrice {
    pub const ZERO: ModelPrice = ModelPrice {
        input_per_1m: 0.0,
        output_per_1m: 0.0,
    };

    const fn new(input_per_1m: f64, output_per_1m: f64) -> Self {
        Self {
            input_per_1m,
            output_per_1m,
        }
    }
}

static MODEL_PRICES: phf::Map<&'static str, ModelPrice> = phf_map! {
    "gpt-5-2-pro" => ModelPrice::new(21.0, 168.0),
    "gpt-5-2-thinking" => ModelPrice::new(1.75, 14.0),
    "gpt-5-2-instant" => ModelPrice::new(1.75, 14.0),
    "gpt-5-2-chat" => ModelPrice::new(1.75, 14.0),
    "gpt-5-2" => ModelPrice::new(1.75, 14.0),
    "gpt-5-1-pro" => ModelPrice::new(15.0, 120.0),
    "gpt-5-1-thinking" => ModelPrice::new(1.25, 10.0),
    "gpt-5-1-instant" => ModelPrice::new(1.25, 10.0),
    "gpt-5-1" => ModelPrice::new(1.25, 10.0),
    "gpt-5-instant" => ModelPrice::new(1.25, 10.0),
    "gpt-5-pro" => ModelPrice::new(15.0, 120.0),
    "gpt-5-a-t-mini" => ModelPrice::new(0.25, 2.0),
    "gpt-5-t-mini" => ModelPrice::new(0.25, 2.0),
    "gpt-5-thinking" => ModelPrice::new(1.25, 10.0),
    "gpt-5-mini" => ModelPrice::new(0.25, 2.0),
    "gpt-5" => ModelPrice::new(1.25, 10.0),
    "o3-pro" => ModelPrice::new(20.0, 80.0),
    "gpt-4-1-mini" => ModelPrice::new(0.40, 1.60),
    "gpt-4-1" => ModelPrice::new(2.0, 8.0),
    "gpt-4-5" => ModelPrice::new(75.0, 150.0),
    "o3" => ModelPrice::new(2.0, 8.0),
    "o4-mini-high" => ModelPrice::new(1.10, 4.40),
    "o4-mini" => ModelPrice::new(1.10, 4.40),
    // Deep research runs on o3
    "research" => ModelPrice::new(10.0, 40.0),
    "o1-pro" => ModelPrice::new(150.0, 600.0),
    "o3-mini-high" => ModelPrice::new(1.10, 4.40),
    "o3-mini" => ModelPrice::new(1.10, 4.40),
    "o1" => ModelPrice::new(15.0, 60.0),
    "o1-preview" => ModelPrice::new(15.0, 60.0),
    "o1-mini" => ModelPrice::new(1.10, 4.40),
    // gpt-4o with canvas
    "gpt-4o-canmore" => ModelPrice::new(2.50, 10.0),
    "gpt-4o-mini" => ModelPrice::new(0.15, 0.60),
    "gpt-4o" => ModelPrice::new(2.50, 10.0),
    "gpt-4-turbo" => ModelPrice::new(10.0, 30.0),
    "gpt-4" => ModelPrice::new(30.0, 60.0),
    "gpt-4-vision-preview" => ModelPrice::new(10.0, 30.0),
    "gpt-3.5-turbo" => ModelPrice::new(0.50, 1.50),
    "text-davinci-002" => ModelPrice::new(20.0, 20.0),
};

/// Model ids with this prefix are the legacy default model and priced as `text-davinci-002`.
const LEGACY_RENDER_PREFIX: &str = "text-davinci-002-render";

/// Immutable model → price lookup.
///
/// Built from the bundled price list plus optional overrides; passed explicitly
/// to whatever needs to turn token counts into cost.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    overrides: BTreeMap<String, ModelPrice>,
}

impl PricingTable {
    /// The bundled prices only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Bundled prices with `overrides` taking precedence (and adding new models).
    pub fn with_overrides(overrides: BTreeMap<String, ModelPrice>) -> Self {
        Self { overrides }
    }

    /// Price for `model`, or `None` when the model is unknown.
    pub fn lookup(&self, model: &str) -> Option<ModelPrice> {
        if let Some(price) = self.overrides.get(model) {
            return Some(*price);
        }
        if let Some(price) = MODEL_PRICES.get(model) {
            return Some(*price);
        }
        if model.starts_with(LEGACY_RENDER_PREFIX) {
            return MODEL_PRICES.get("text-davinci-002").copied();
        }
        None
    }

    /// Price for `model`, defaulting to zero (with a one-time warning) when unknown.
    pub fn get(&self, model: &str) -> ModelPrice {
        self.lookup(model).unwrap_or_else(|| {
            warn_once(format!("Unknown model: {model}. Defaulting to $0."));
            ModelPrice::ZERO
        })
    }

    pub fn input_cost(&self, model: &str, tokens: u64) -> f64 {
        calculate_cost(tokens, self.get(model).input_per_1m)
    }

    pub fn output_cost(&self, model: &str, tokens: u64) -> f64 {
        calculate_cost(tokens, self.get(model).output_per_1m)
    }
}

/// Cost of `tokens` at `cost_per_million`.
pub fn calculate_cost(tokens: u64, cost_per_million: f64) -> f64 {
    (tokens as f64 / 1_000_000.0) * cost_per_million
}
