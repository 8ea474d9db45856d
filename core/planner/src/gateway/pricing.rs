/// Per-million-token rates in USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub model: &'static str,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

pub const RATES: [ModelRate; 3] = [
    ModelRate {
        model: "gpt-4o-mini",
        input_per_million: 0.15,
        output_per_million: 0.60,
    },
    ModelRate {
        model: "claude-sonnet-4-20250514",
        input_per_million: 3.00,
        output_per_million: 15.00,
    },
    ModelRate {
        model: "claude-3-5-haiku-20241022",
        input_per_million: 0.80,
        output_per_million: 4.00,
    },
];

/// Rate for a model id; unknown ids fall back to the cheapest known rate
pub fn rate_for(model: &str) -> ModelRate {
    RATES
        .iter()
        .find(|rate| rate.model == model)
        .copied()
        .unwrap_or_else(cheapest)
}

fn cheapest() -> ModelRate {
    RATES.iter().copied().fold(RATES[0], |best, rate| {
        if rate.input_per_million + rate.output_per_million
            < best.input_per_million + best.output_per_million
        {
            rate
        } else {
            best
        }
    })
}

pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let rate = rate_for(model);
    (input_tokens as f64 / 1_000_000.0) * rate.input_per_million
        + (output_tokens as f64 / 1_000_000.0) * rate.output_per_million
}
