//! Shared pieces for the ragkit demos: offline stand-ins for the model
//! providers and the sample data the walkthroughs ingest.

use ragkit::{AnswerGenerator, EmbeddingProvider, Result};

/// Deterministic bag-of-words embedder for running demos with no API keys.
///
/// Each lowercase word is hashed into one of `dimensions` buckets, so texts
/// sharing vocabulary point in similar directions.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        ragkit::similarity::normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Answers by quoting the first line of context back.
pub struct QuotingGenerator;

#[async_trait::async_trait]
impl AnswerGenerator for QuotingGenerator {
    async fn generate(&self, _system_prompt: &str, context: &str, _question: &str) -> Result<String> {
        Ok(match context.lines().find(|line| !line.trim().is_empty()) {
            Some(line) => format!("According to our policy: {line}"),
            None => "I could not find anything relevant in the policy documents.".to_string(),
        })
    }
}

/// Retail store policy snippets, one per document.
pub const STORE_POLICIES: [&str; 15] = [
    "Customers may return electronics within 30 days with a receipt and original packaging.",
    "Grocery items can be returned within 90 days with proof of purchase, except perishable products.",
    "We offer a 1-year warranty on most electronics and appliances. See product details for exceptions.",
    "Plus members get free shipping with no minimum order amount.",
    "Prescription medications are not eligible for return or exchange.",
    "Open-box items are eligible for return within the standard return period, but must include all original accessories.",
    "Without a receipt, most returns are eligible for store credit with valid photo identification.",
    "We allow price matching for identical items found on our website and in local competitor ads.",
    "Vision Center purchases may be returned or exchanged within 60 days with a receipt.",
    "Returns on cell phones require the device to be unlocked and all personal data erased.",
    "Gift cards cannot be redeemed for cash except where required by law.",
    "Seasonal merchandise (e.g., holiday decorations) may have modified return windows, see in-store signage.",
    "Bicycles can be returned within 90 days if not used outdoors and with all accessories present.",
    "Online orders can be returned in store or by mail using the prepaid label.",
    "We reserve the right to deny returns suspected of fraud or abuse.",
];

/// Delivery log lines covering every delay category.
pub const DELIVERY_LOGS: [&str; 20] = [
    "Heavy traffic near depot",
    "Customer wasn't available at drop-off",
    "Vehicle broke down mid-delivery",
    "Thunderstorm delayed departure",
    "Barcode unreadable, needed manual entry",
    "Driver missed turn and rerouted",
    "Arrived on schedule, no delay",
    "Wrong address on package",
    "System reboot caused docking issue",
    "Accident near warehouse caused delay",
    "Late start due to staff confusion",
    "Windstorm disrupted outdoor loading",
    "Scanner error during inventory",
    "Package mixed with wrong batch",
    "Driver forgot to confirm arrival",
    "Navigation system crashed",
    "Customer changed delivery time last minute",
    "Engine warning light triggered mid-trip",
    "Rain made roadside unsafe",
    "Security check took longer than expected",
];
