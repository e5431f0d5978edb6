use ego_tree::iter::Edge;
use ego_tree::NodeId;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
    Preformatted,
    Image,
    Rule,
}

/// One typeset unit of the page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLayout {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

/// Flattens an HTML document into blocks. Relative link and image targets are
/// resolved against `base_url`.
///
/// The tree is walked with an explicit edge traversal, so nesting depth only
/// costs heap.
pub fn layout_document(html: &str, base_url: Option<&Url>) -> PageLayout {
    let document = Html::parse_document(html);
    let mut ctx = LayoutContext::new(base_url);

    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next());
    walk(body.unwrap_or_else(|| document.root_element()), &mut ctx);
    ctx.flush();

    PageLayout {
        title: extract_title(&document),
        blocks: ctx.blocks,
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

struct LayoutContext<'a> {
    base_url: Option<&'a Url>,
    blocks: Vec<Block>,
    current: String,
    kind: BlockKind,
    enclosing: Vec<BlockKind>,
    preformatted_depth: usize,
}

impl<'a> LayoutContext<'a> {
    fn new(base_url: Option<&'a Url>) -> Self {
        Self {
            base_url,
            blocks: Vec::new(),
            current: String::new(),
            kind: BlockKind::Paragraph,
            enclosing: Vec::new(),
            preformatted_depth: 0,
        }
    }

    fn start_block(&mut self, kind: BlockKind) {
        self.flush();
        self.enclosing.push(self.kind);
        self.kind = kind;
    }

    /// Closes the innermost block; trailing text belongs to its parent again.
    fn end_block(&mut self) {
        self.flush();
        self.kind = self.enclosing.pop().unwrap_or(BlockKind::Paragraph);
    }

    fn append_text(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn push_block(&mut self, kind: BlockKind, text: String) {
        self.flush();
        self.blocks.push(Block { kind, text });
    }

    fn flush(&mut self) {
        let text = if self.kind == BlockKind::Preformatted {
            self.current.trim_matches('\n').trim_end().to_string()
        } else {
            collapse_whitespace(&self.current)
        };
        self.current.clear();
        if !text.is_empty() {
            self.blocks.push(Block {
                kind: self.kind,
                text,
            });
        }
    }

    fn resolve(&self, target: &str) -> Option<String> {
        let target = target.trim();
        if target.is_empty() || target.starts_with('#') || target.starts_with("javascript:") {
            return None;
        }
        let resolved = match self.base_url {
            Some(base) => base.join(target).ok()?,
            None => Url::parse(target).ok()?,
        };
        matches!(resolved.scheme(), "http" | "https" | "mailto").then(|| resolved.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Anchor,
    Image,
    LineBreak,
    Rule,
    Block(BlockKind),
    Container,
    Cell,
    Skipped,
    Inline,
}

fn role_of(tag: &str) -> Role {
    match tag {
        "a" => Role::Anchor,
        "img" => Role::Image,
        "br" => Role::LineBreak,
        "hr" => Role::Rule,
        "h1" => Role::Block(BlockKind::Heading(1)),
        "h2" => Role::Block(BlockKind::Heading(2)),
        "h3" => Role::Block(BlockKind::Heading(3)),
        "h4" => Role::Block(BlockKind::Heading(4)),
        "h5" => Role::Block(BlockKind::Heading(5)),
        "h6" => Role::Block(BlockKind::Heading(6)),
        "li" | "dt" | "dd" => Role::Block(BlockKind::ListItem),
        "blockquote" => Role::Block(BlockKind::Quote),
        "pre" => Role::Block(BlockKind::Preformatted),
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
        | "figure" | "figcaption" | "table" | "tr" | "ul" | "ol" | "dl" | "address" | "form" => {
            Role::Container
        }
        "td" | "th" => Role::Cell,
        // nothing printable
        "script" | "style" | "noscript" | "iframe" | "template" | "head" | "svg" | "canvas" => {
            Role::Skipped
        }
        _ => Role::Inline,
    }
}

fn walk(root: ElementRef, ctx: &mut LayoutContext) {
    let mut skipping: Option<NodeId> = None;
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipping.is_some() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => ctx.append_text(text),
                    Node::Element(_) => {
                        if let Some(element) = ElementRef::wrap(node) {
                            if open_element(element, ctx) == Role::Skipped {
                                skipping = Some(node.id());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if let Some(id) = skipping {
                    if id == node.id() {
                        skipping = None;
                    }
                    continue;
                }
                if let Some(element) = ElementRef::wrap(node) {
                    close_element(element, ctx);
                }
            }
        }
    }
}

fn tag_role(element: ElementRef) -> Role {
    role_of(&element.value().name().to_ascii_lowercase())
}

fn open_element(element: ElementRef, ctx: &mut LayoutContext) -> Role {
    let role = tag_role(element);
    match role {
        Role::Image => handle_image(element, ctx),
        Role::LineBreak => {
            if ctx.preformatted_depth > 0 {
                ctx.append_text("\n");
            } else {
                ctx.flush();
            }
        }
        Role::Rule => ctx.push_block(BlockKind::Rule, String::new()),
        Role::Block(kind) => {
            ctx.start_block(kind);
            if kind == BlockKind::Preformatted {
                ctx.preformatted_depth += 1;
            }
        }
        Role::Container => ctx.flush(),
        Role::Anchor | Role::Cell | Role::Skipped | Role::Inline => {}
    }
    role
}

fn close_element(element: ElementRef, ctx: &mut LayoutContext) {
    match tag_role(element) {
        Role::Anchor => handle_anchor(element, ctx),
        Role::Block(kind) => {
            if kind == BlockKind::Preformatted {
                ctx.preformatted_depth = ctx.preformatted_depth.saturating_sub(1);
            }
            ctx.end_block();
        }
        Role::Container => ctx.flush(),
        Role::Cell => ctx.append_text("  "),
        Role::Image | Role::LineBreak | Role::Rule | Role::Skipped | Role::Inline => {}
    }
}

/// Runs after the anchor's children; appends the resolved target.
fn handle_anchor(element: ElementRef, ctx: &mut LayoutContext) {
    let Some(href) = element.value().attr("href").and_then(|h| ctx.resolve(h)) else {
        return;
    };
    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        ctx.append_text(&href);
    } else if text != href {
        ctx.append_text(&format!(" <{href}>"));
    }
}

fn handle_image(element: ElementRef, ctx: &mut LayoutContext) {
    let alt = element
        .value()
        .attr("alt")
        .map(collapse_whitespace)
        .filter(|alt| !alt.is_empty());
    let src = element.value().attr("src").and_then(|src| ctx.resolve(src));
    let text = match (alt, src) {
        (Some(alt), Some(src)) => format!("[Image: {alt}] {src}"),
        (Some(alt), None) => format!("[Image: {alt}]"),
        (None, Some(src)) => format!("[Image] {src}"),
        (None, None) => return,
    };
    ctx.push_block(BlockKind::Image, text);
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
