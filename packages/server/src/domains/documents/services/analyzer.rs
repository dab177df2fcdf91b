//! Deterministic clause analyzer.
//!
//! Each clause gets a band: where its drafting sits relative to market,
//! computed from a per-clause-type baseline, drafting signals found in the
//! text, and the document's leverage weighting. Scores near 0 favor the
//! founder side, near 1 the investor side.

use anyhow::Result;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::Db;
use crate::domains::documents::models::{Analysis, Leverage};

use super::extract_rules::DOCUMENT_OVERVIEW_KEY;

pub const BAND_FOUNDER: &str = "founder_favorable";
pub const BAND_MARKET: &str = "market";
pub const BAND_INVESTOR: &str = "investor_favorable";

/// How investor-leaning a clause type is before reading its text.
fn base_tilt(clause_key: &str) -> f64 {
    match clause_key {
        "liquidation_preference" | "anti_dilution" => 0.20,
        "reserved_matters" | "drag_along" => 0.15,
        "board_composition" | "option_pool" | "exclusivity" => 0.10,
        "right_of_first_refusal" | "information_rights" | "preemptive_rights" | "vesting" => 0.05,
        "tag_along" => -0.05,
        _ => 0.0,
    }
}

struct Signals {
    tilt: f64,
    findings: Vec<String>,
}

impl Signals {
    fn hit(&mut self, condition: bool, delta: f64, label: &str) {
        if condition {
            self.tilt += delta;
            self.findings.push(label.to_string());
        }
    }
}

/// Drafting signals: phrases that move a clause off its baseline.
fn text_signals(text: &str) -> (f64, Vec<String>) {
    let lower = text.to_lowercase();
    let mut signals = Signals {
        tilt: 0.0,
        findings: Vec::new(),
    };

    signals.hit(
        lower.contains("full ratchet") || lower.contains("full-ratchet"),
        0.25,
        "full-ratchet adjustment",
    );
    signals.hit(
        lower.contains("broad-based") || lower.contains("broad based"),
        -0.10,
        "broad-based weighted average",
    );
    let non_participating =
        lower.contains("non-participating") || lower.contains("non participating");
    signals.hit(non_participating, -0.10, "non-participating preference");
    signals.hit(
        !non_participating && lower.contains("participating"),
        0.15,
        "participating preference",
    );
    signals.hit(
        lower.contains("2x") || lower.contains("3x") || lower.contains("two times"),
        0.20,
        "multiple above 1x",
    );
    signals.hit(lower.contains("sole discretion"), 0.15, "sole-discretion trigger");
    signals.hit(
        lower.contains("majority of the board"),
        0.10,
        "board-majority control",
    );
    signals.hit(
        lower.contains("independent director"),
        -0.05,
        "independent director seat",
    );
    signals.hit(lower.contains("mutual"), -0.05, "mutual obligation");

    (signals.tilt, signals.findings)
}

fn band_for_score(score: f64) -> &'static str {
    if score < 0.45 {
        BAND_FOUNDER
    } else if score <= 0.60 {
        BAND_MARKET
    } else {
        BAND_INVESTOR
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Pure banding computation, exposed for the on-demand analyze endpoint and
/// for tests.
pub fn band_clause(clause_key: &str, clause_text: &str, leverage: &Leverage) -> (String, f64, Vec<String>) {
    if clause_key == DOCUMENT_OVERVIEW_KEY {
        return (BAND_MARKET.to_string(), 0.5, vec!["overview only".to_string()]);
    }

    let (signal_tilt, findings) = text_signals(clause_text);
    let tilt = base_tilt(clause_key) + signal_tilt;
    let score = clamp01(0.5 + tilt + 0.2 * (leverage.investor - leverage.founder));
    (band_for_score(score).to_string(), score, findings)
}

/// Analyze one clause and upsert its analysis row.
#[allow(clippy::too_many_arguments)]
pub async fn analyze_clause(
    db: &Db,
    conn: &mut PgConnection,
    document_id: Uuid,
    clause_id: Uuid,
    clause_key: &str,
    clause_text: &str,
    leverage: &Leverage,
    attributes: Option<&serde_json::Value>,
) -> Result<Analysis> {
    let (band_name, band_score, findings) = band_clause(clause_key, clause_text, leverage);

    let inputs = json!({
        "clause_key": clause_key,
        "leverage": leverage,
        "attributes": attributes,
    });
    let analysis = json!({
        "band": band_name,
        "findings": findings,
    });

    Analysis::upsert(
        db,
        conn,
        document_id,
        clause_id,
        &band_name,
        band_score,
        &inputs,
        &analysis,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_leverage_puts_plain_clauses_near_market() {
        let leverage = Leverage::default();
        let (band, score, _) = band_clause("tag_along", "customary tag-along rights", &leverage);
        assert_eq!(band, BAND_MARKET);
        assert!((0.45..=0.60).contains(&score));
    }

    #[test]
    fn aggressive_terms_band_investor_favorable() {
        let leverage = Leverage::default();
        let (band, score, findings) = band_clause(
            "liquidation_preference",
            "2x participating liquidation preference at the investor's sole discretion",
            &leverage,
        );
        assert_eq!(band, BAND_INVESTOR);
        assert!(score > 0.6);
        assert!(findings.iter().any(|f| f.contains("participating")));
    }

    #[test]
    fn softened_terms_pull_back_toward_founders() {
        let leverage = Leverage {
            investor: 0.3,
            founder: 0.7,
        };
        let (band, score, _) = band_clause(
            "anti_dilution",
            "broad-based weighted average anti-dilution with mutual carve-outs \
             and an independent director approval right",
            &leverage,
        );
        assert!(score < 0.5);
        assert_ne!(band, BAND_INVESTOR);
    }

    #[test]
    fn overview_clause_is_always_market() {
        let leverage = Leverage {
            investor: 1.0,
            founder: 0.0,
        };
        let (band, score, _) = band_clause(DOCUMENT_OVERVIEW_KEY, "anything", &leverage);
        assert_eq!(band, BAND_MARKET);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn banding_is_deterministic() {
        let leverage = Leverage::default();
        let a = band_clause("drag_along", "drag along on a sale of the company", &leverage);
        let b = band_clause("drag_along", "drag along on a sale of the company", &leverage);
        assert_eq!(a, b);
    }

    #[test]
    fn non_participating_does_not_double_count_participating() {
        let leverage = Leverage::default();
        let (_, _, findings) = band_clause(
            "liquidation_preference",
            "1x non-participating preference",
            &leverage,
        );
        assert!(findings.iter().any(|f| f.contains("non-participating")));
        assert!(!findings.iter().any(|f| f == "participating preference"));
    }
}
