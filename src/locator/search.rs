use std::sync::Arc;

use serde_json::Value;

use crate::model::{Node, Slide, State};

/// Where an element lives: the slide, the node on that slide, and the
/// element inside the node's data.
#[derive(Debug, Clone, Copy)]
pub struct ElementLocation<'a> {
    pub slide: &'a Arc<Slide>,
    pub node: &'a Arc<Node>,
    pub element: &'a Value,
}

/// Search every node of every slide, in order, and stop at the first hit.
pub fn find_in_slides<'a>(slides: &'a [Arc<Slide>], element_id: &str) -> Option<ElementLocation<'a>> {
    slides.iter().find_map(|slide| {
        slide.nodes.iter().find_map(move |node| {
            super::find(&node.data, element_id).map(|element| ElementLocation {
                slide,
                node,
                element,
            })
        })
    })
}

/// Current value of `properties[property]` on the element, if both exist.
pub fn element_property(state: &State, element_id: &str, property: &str) -> Option<Value> {
    find_in_slides(&state.slides, element_id)?
        .element
        .get("properties")?
        .get(property)
        .cloned()
}
