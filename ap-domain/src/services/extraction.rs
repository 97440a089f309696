// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Dual-pass extraction comparison and merge (spec.md §4.4). The LLM calls
//! themselves go through `LlmPort`; everything here is pure post-processing
//! of two already-parsed payloads.

use serde_json::Value;

/// The fixed scalar field set compared between passes (spec.md §4.4).
const COMPARED_SCALAR_FIELDS: &[&str] = &[
    "invoice_number",
    "vendor_name",
    "vendor_address",
    "invoice_date",
    "due_date",
    "currency",
    "subtotal",
    "tax_amount",
    "total_amount",
    "payment_terms",
];

fn normalized_scalar(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| Some(v.to_string())))
        .map(|s| s.trim().to_lowercase())
}

fn line_items_count(value: &Value) -> Option<usize> {
    value.get("line_items").and_then(Value::as_array).map(Vec::len)
}

/// Field names that differ after case-folded, whitespace-trimmed comparison,
/// plus `line_items_count` if the two passes disagree on line-item count
/// (spec.md §4.4).
pub fn compare_passes(p1: &Value, p2: &Value) -> Vec<String> {
    let mut discrepancies = Vec::new();

    for field in COMPARED_SCALAR_FIELDS {
        let a = normalized_scalar(p1, field);
        let b = normalized_scalar(p2, field);
        if a != b {
            discrepancies.push((*field).to_string());
        }
    }

    if line_items_count(p1) != line_items_count(p2) {
        discrepancies.push("line_items_count".to_string());
    }

    discrepancies
}

/// Keeps pass 1 as primary for every field; line items fall back to pass 2
/// only when pass 1's are empty (spec.md §4.4).
pub fn merge_passes(p1: &Value, p2: &Value) -> Value {
    let mut merged = p1.clone();
    let p1_line_items_empty = p1
        .get("line_items")
        .and_then(Value::as_array)
        .map(|a| a.is_empty())
        .unwrap_or(true);

    if p1_line_items_empty {
        if let Some(p2_lines) = p2.get("line_items") {
            if let Some(obj) = merged.as_object_mut() {
                obj.insert("line_items".to_string(), p2_lines.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compare_passes_ignores_case_and_whitespace() {
        let p1 = json!({ "vendor_name": "  Acme  Corp " });
        let p2 = json!({ "vendor_name": "acme  corp" });
        assert!(compare_passes(&p1, &p2).is_empty());
    }

    #[test]
    fn compare_passes_flags_differing_scalars_and_line_count() {
        let p1 = json!({ "total_amount": "100.00", "line_items": [{}] });
        let p2 = json!({ "total_amount": "105.00", "line_items": [] });
        let diffs = compare_passes(&p1, &p2);
        assert!(diffs.contains(&"total_amount".to_string()));
        assert!(diffs.contains(&"line_items_count".to_string()));
    }

    #[test]
    fn empty_payloads_produce_no_discrepancies() {
        assert!(compare_passes(&json!({}), &json!({})).is_empty());
    }

    #[test]
    fn merge_keeps_pass_one_primary_falls_back_line_items() {
        let p1 = json!({ "total_amount": "100.00", "line_items": [] });
        let p2 = json!({ "total_amount": "105.00", "line_items": [{"description": "widget"}] });
        let merged = merge_passes(&p1, &p2);
        assert_eq!(merged["total_amount"], "100.00");
        assert_eq!(merged["line_items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_does_not_fall_back_when_pass_one_has_line_items() {
        let p1 = json!({ "line_items": [{"description": "bolt"}] });
        let p2 = json!({ "line_items": [{"description": "widget"}, {"description": "nut"}] });
        let merged = merge_passes(&p1, &p2);
        assert_eq!(merged["line_items"].as_array().unwrap().len(), 1);
    }
}
