//! Clause relationship graph.
//!
//! Nodes are the document's clauses; edges link clauses that negotiate
//! together (same term-sheet category), in document order.

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub clause_key: Option<String>,
    pub title: Option<String>,
}

fn category_for(clause_key: &str) -> Option<&'static str> {
    match clause_key {
        "liquidation_preference" | "anti_dilution" | "option_pool" => Some("economics"),
        "board_composition" | "reserved_matters" | "information_rights" => Some("control"),
        "right_of_first_refusal" | "tag_along" | "drag_along" | "preemptive_rights" => {
            Some("transfer")
        }
        "exclusivity" | "vesting" => Some("process"),
        _ => None,
    }
}

/// Build the stored `graph_json`: the node list as given plus deterministic
/// same-category edges between consecutive clauses.
pub fn build_graph(document_id: Uuid, nodes: &[GraphNode]) -> serde_json::Value {
    let mut edges = Vec::new();
    let mut last_in_category: std::collections::HashMap<&'static str, &GraphNode> =
        std::collections::HashMap::new();

    for node in nodes {
        let Some(category) = node.clause_key.as_deref().and_then(category_for) else {
            continue;
        };
        if let Some(previous) = last_in_category.insert(category, node) {
            edges.push(json!({
                "source": previous.id,
                "target": node.id,
                "relation": format!("category:{category}"),
            }));
        }
    }

    json!({
        "document_id": document_id,
        "nodes": nodes,
        "edges": edges,
        "generator": {"engine": "rules", "version": "1"},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, key: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            clause_key: Some(key.into()),
            title: Some(key.into()),
        }
    }

    #[test]
    fn same_category_clauses_are_linked_in_order() {
        let nodes = vec![
            node("c-1", "drag_along"),
            node("c-2", "board_composition"),
            node("c-3", "tag_along"),
            node("c-4", "right_of_first_refusal"),
        ];
        let graph = build_graph(Uuid::nil(), &nodes);
        let edges = graph["edges"].as_array().unwrap();
        // transfer: c-1 → c-3 → c-4; control has a single node, no edge.
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0]["source"], "c-1");
        assert_eq!(edges[0]["target"], "c-3");
        assert_eq!(edges[1]["source"], "c-3");
        assert_eq!(edges[1]["target"], "c-4");
        assert_eq!(edges[0]["relation"], "category:transfer");
    }

    #[test]
    fn nodes_are_preserved_verbatim() {
        let nodes = vec![node("c-1", "document_overview")];
        let graph = build_graph(Uuid::nil(), &nodes);
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 1);
        assert!(graph["edges"].as_array().unwrap().is_empty());
        assert_eq!(graph["generator"]["engine"], "rules");
    }

    #[test]
    fn graph_is_deterministic() {
        let nodes = vec![node("c-1", "drag_along"), node("c-2", "tag_along")];
        assert_eq!(
            build_graph(Uuid::nil(), &nodes),
            build_graph(Uuid::nil(), &nodes)
        );
    }
}
