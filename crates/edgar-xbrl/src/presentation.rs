//! Presentation linkbase parsing, tree-based via `roxmltree` since the
//! linkbase is small (a handful of `presentationLink` networks) and needs
//! parent/child graph traversal rather than streaming.

use roxmltree::Document;
use std::collections::HashMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PresentationNode {
    pub parent_concept: Option<String>,
    pub depth: i32,
    pub label: Option<String>,
}

/// Maps concept name (`prefix:local`) to its position in the presentation
/// tree. Built from every `presentationLink` network in the linkbase;
/// concepts appearing in more than one network keep their shallowest
/// occurrence (the root-most depth across all networks).
pub type PresentationTree = HashMap<String, PresentationNode>;

fn xlink_attr<'a>(node: &roxmltree::Node<'a, 'a>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

fn local_concept_name(href: &str) -> Option<String> {
    // href like "...#us-gaap_Assets" or "...#Assets" after the fragment.
    let fragment = href.rsplit('#').next()?;
    let (prefix, local) = fragment.split_once('_')?;
    Some(format!("{prefix}:{local}"))
}

/// Parses a presentation linkbase XML document into a flat concept->node
/// map, walking each `presentationLink`'s loc/arc pairs into a tree and
/// assigning `depth` by distance from that network's roots.
pub fn parse_presentation_linkbase(xml: &str) -> Option<PresentationTree> {
    let doc = Document::parse(xml).ok()?;
    let mut tree = PresentationTree::new();

    for link in doc
        .descendants()
        .filter(|n| n.tag_name().name() == "presentationLink")
    {
        let mut label_to_concept: HashMap<String, String> = HashMap::new();
        for loc in link.children().filter(|n| n.tag_name().name() == "loc") {
            let href = xlink_attr(&loc, "href").unwrap_or_default();
            let label = xlink_attr(&loc, "label").unwrap_or_default();
            if let Some(concept) = local_concept_name(href) {
                label_to_concept.insert(label.to_string(), concept);
            }
        }

        let mut children_of: HashMap<String, Vec<(String, Option<String>)>> = HashMap::new();
        let mut has_parent: HashMap<String, bool> = HashMap::new();

        for arc in link.children().filter(|n| n.tag_name().name() == "presentationArc") {
            let from = xlink_attr(&arc, "from").unwrap_or_default();
            let to = xlink_attr(&arc, "to").unwrap_or_default();
            let title = xlink_attr(&arc, "title").map(|s| s.to_string());

            if let (Some(parent_concept), Some(child_concept)) =
                (label_to_concept.get(from), label_to_concept.get(to))
            {
                children_of
                    .entry(parent_concept.clone())
                    .or_default()
                    .push((child_concept.clone(), title));
                has_parent.insert(child_concept.clone(), true);
            }
        }

        let roots: Vec<String> = label_to_concept
            .values()
            .filter(|c| !has_parent.get(*c).copied().unwrap_or(false))
            .cloned()
            .collect();

        for root in roots {
            walk(&root, None, 0, &children_of, &mut tree);
        }
    }

    Some(tree)
}

fn walk(
    concept: &str,
    parent: Option<&str>,
    depth: i32,
    children_of: &HashMap<String, Vec<(String, Option<String>)>>,
    tree: &mut PresentationTree,
) {
    let better_depth = tree
        .get(concept)
        .map(|existing| depth < existing.depth)
        .unwrap_or(true);
    if better_depth {
        tree.insert(
            concept.to_string(),
            PresentationNode {
                parent_concept: parent.map(|p| p.to_string()),
                depth,
                label: None,
            },
        );
    }

    if let Some(children) = children_of.get(concept) {
        for (child, title) in children {
            walk(child, Some(concept), depth + 1, children_of, tree);
            if let Some(node) = tree.get_mut(child) {
                if node.label.is_none() {
                    node.label = title.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LINKBASE: &str = r#"<?xml version="1.0"?>
<linkbase xmlns:xlink="http://www.w3.org/1999/xlink">
  <presentationLink>
    <loc xlink:label="loc_assets" xlink:href="https://xbrl.sec.gov/us-gaap#us-gaap_Assets"/>
    <loc xlink:label="loc_cash" xlink:href="https://xbrl.sec.gov/us-gaap#us-gaap_CashAndCashEquivalentsAtCarryingValue"/>
    <presentationArc xlink:from="loc_assets" xlink:to="loc_cash" xlink:title="Cash and cash equivalents"/>
  </presentationLink>
</linkbase>"#;

    #[test]
    fn builds_parent_depth_and_label_from_arcs() {
        let tree = parse_presentation_linkbase(SAMPLE_LINKBASE).unwrap();
        let cash = tree.get("us-gaap:CashAndCashEquivalentsAtCarryingValue").unwrap();
        assert_eq!(cash.parent_concept.as_deref(), Some("us-gaap:Assets"));
        assert_eq!(cash.depth, 1);
        assert_eq!(cash.label.as_deref(), Some("Cash and cash equivalents"));

        let assets = tree.get("us-gaap:Assets").unwrap();
        assert_eq!(assets.parent_concept, None);
        assert_eq!(assets.depth, 0);
    }
}
