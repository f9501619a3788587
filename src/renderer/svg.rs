//! SVG surface

use std::collections::BTreeMap;

use crate::layout::{EntityKind, Rect};

use super::surface::{DrawItem, RenderHandle, Surface};
use super::SvgConfig;

#[derive(Debug, Clone)]
struct Element {
    markup: String,
    /// Drawn outer box, offset applied
    bounds: Rect,
}

/// Collects drawn entities and builds an SVG document from them
///
/// Elements keep the position of their first draw; redrawing an entity
/// replaces its markup in place.
#[derive(Debug)]
pub struct SvgSurface {
    config: SvgConfig,
    next_handle: u64,
    elements: BTreeMap<RenderHandle, Element>,
}

impl SvgSurface {
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            next_handle: 0,
            elements: BTreeMap::new(),
        }
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn prefix(&self) -> &str {
        self.config.class_prefix.as_deref().unwrap_or_default()
    }

    fn offset(&self, item: &DrawItem<'_>) -> (f64, f64) {
        if self.config.apply_offsets {
            item.offset
        } else {
            (0.0, 0.0)
        }
    }

    fn indent_str(&self, depth: usize) -> String {
        if self.config.pretty_print {
            "  ".repeat(depth + 1)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    fn element_markup(&self, item: &DrawItem<'_>, handle: RenderHandle) -> String {
        let prefix = self.prefix();
        let (dx, dy) = self.offset(item);
        let outer = item.outer.translate(dx, dy);
        let indent = self.indent_str(item.depth);
        let id_attr = match item.name {
            Some(name) => format!(r#" id="{}""#, escape_xml(name)),
            None => format!(r#" id="{}e{}""#, prefix, handle.0),
        };
        let kind_class = match item.kind {
            EntityKind::Leaf => "leaf",
            EntityKind::Container => "container",
            EntityKind::Stack => "stack",
        };

        let mut markup = format!(
            r#"{}<rect{} class="{}entity {}{}" x="{}" y="{}" width="{}" height="{}"/>"#,
            indent,
            id_attr,
            prefix,
            prefix,
            kind_class,
            outer.x,
            outer.y,
            outer.width,
            outer.height
        );

        let nl = self.newline();
        if self.config.show_content_boxes {
            let content = item.content.translate(dx, dy);
            markup.push_str(nl);
            markup.push_str(&format!(
                r#"{}<rect class="{}content" x="{}" y="{}" width="{}" height="{}"/>"#,
                indent, prefix, content.x, content.y, content.width, content.height
            ));
        }
        if self.config.show_labels {
            if let Some(name) = item.name {
                markup.push_str(nl);
                markup.push_str(&format!(
                    r#"{}<text class="{}label" x="{}" y="{}">{}</text>"#,
                    indent,
                    prefix,
                    outer.x,
                    outer.y,
                    escape_xml(name)
                ));
            }
        }
        markup
    }

    /// Union of all drawn boxes
    fn bounds(&self) -> Rect {
        let mut boxes = self.elements.values().map(|element| element.bounds);
        match boxes.next() {
            Some(first) => boxes.fold(first, |acc, b| acc.union(&b)),
            None => Rect::zero(),
        }
    }

    /// Build the SVG document
    pub fn build(&self) -> String {
        let viewbox = self.bounds();
        let padding = self.config.viewbox_padding;
        let vb_x = viewbox.x - padding;
        let vb_y = viewbox.y - padding;
        let vb_w = viewbox.width + 2.0 * padding;
        let vb_h = viewbox.height + 2.0 * padding;

        let nl = self.newline();
        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            vb_x, vb_y, vb_w, vb_h
        ));
        svg.push_str(nl);

        for element in self.elements.values() {
            svg.push_str(&element.markup);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");
        svg
    }
}

impl Surface for SvgSurface {
    fn draw(&mut self, item: &DrawItem<'_>, previous: Option<RenderHandle>) -> RenderHandle {
        let handle = match previous {
            Some(handle) if self.elements.contains_key(&handle) => handle,
            _ => {
                let handle = RenderHandle(self.next_handle);
                self.next_handle += 1;
                handle
            }
        };
        let (dx, dy) = self.offset(item);
        let element = Element {
            markup: self.element_markup(item, handle),
            bounds: item.outer.translate(dx, dy),
        };
        self.elements.insert(handle, element);
        handle
    }

    fn release(&mut self, handle: RenderHandle) {
        self.elements.remove(&handle);
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Diagram, EntityConfig};

    fn item(name: Option<&str>, outer: Rect) -> DrawItem<'_> {
        DrawItem {
            id: Diagram::new()
                .create(EntityConfig::new())
                .unwrap(),
            name,
            kind: EntityKind::Leaf,
            outer,
            content: outer,
            offset: (0.0, 0.0),
            depth: 0,
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
    }

    #[test]
    fn test_empty_document() {
        let surface = SvgSurface::new(SvgConfig::new().with_standalone(false));
        let svg = surface.build();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="-10 -10 20 20""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_redraw_replaces_in_place() {
        let mut surface = SvgSurface::new(SvgConfig::default());
        let first = surface.draw(&item(Some("a"), Rect::new(0.0, 0.0, 5.0, 5.0)), None);
        let second = surface.draw(&item(Some("a"), Rect::new(1.0, 0.0, 5.0, 5.0)), Some(first));
        assert_eq!(first, second);
        assert_eq!(surface.len(), 1);
        assert!(surface.build().contains(r#"x="1""#));
    }

    #[test]
    fn test_release_removes_element() {
        let mut surface = SvgSurface::new(SvgConfig::default());
        let handle = surface.draw(&item(None, Rect::new(0.0, 0.0, 5.0, 5.0)), None);
        surface.release(handle);
        assert!(surface.is_empty());
    }

    #[test]
    fn test_offset_and_classes() {
        let mut surface = SvgSurface::new(SvgConfig::new().with_pretty_print(false));
        let mut drawn = item(Some("gate"), Rect::new(0.0, 0.0, 4.0, 2.0));
        drawn.offset = (0.5, 0.0);
        surface.draw(&drawn, None);
        let svg = surface.build();
        assert!(svg.contains(r#"<rect id="gate" class="pl-entity pl-leaf" x="0.5" y="0" width="4" height="2"/>"#));
    }

    #[test]
    fn test_debug_adds_content_and_label() {
        let mut surface = SvgSurface::new(SvgConfig::default().with_debug(true));
        surface.draw(&item(Some("gate"), Rect::new(0.0, 0.0, 4.0, 2.0)), None);
        let svg = surface.build();
        assert!(svg.contains("pl-content"));
        assert!(svg.contains(r#"<text class="pl-label" x="0" y="0">gate</text>"#));
    }

    #[test]
    fn test_offsets_can_be_ignored() {
        let mut surface = SvgSurface::new(SvgConfig::new().with_offsets(false));
        let mut drawn = item(Some("gate"), Rect::new(0.0, 0.0, 4.0, 2.0));
        drawn.offset = (0.5, 0.0);
        surface.draw(&drawn, None);
        assert!(surface.build().contains(r#"x="0" y="0""#));
    }

    #[test]
    fn test_labels_without_content_boxes() {
        let mut config = SvgConfig::default();
        config.show_labels = true;
        let mut surface = SvgSurface::new(config);
        surface.draw(&item(Some("gate"), Rect::new(0.0, 0.0, 4.0, 2.0)), None);
        let svg = surface.build();
        assert!(!svg.contains("pl-content"));
        assert!(svg.contains(">gate</text>"));
    }
}

