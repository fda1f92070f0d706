//! Layouts wrap rendered content.
//!
//! A layout is a function from child content to wrapped content. Layouts
//! nest by naming a parent with [`Layout::within`]; composing a chain runs
//! the innermost layout first and hands its output to the next one out.
//!
//! ```text
//!   handler body ──> "book" ──> "shelf" ──> "app" ──> response body
//! ```
//!
//! Unknown parents and cycles are rejected when the application is
//! assembled, never while an event is being served.

use crate::error::AssemblyError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// The marker replaced by child content in [`Layout::template`].
pub const OUTLET: &str = "{{outlet}}";

type RenderFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A named rendering wrapper.
#[derive(Clone)]
pub struct Layout {
    name: String,
    parent: Option<String>,
    render: RenderFn,
    missing_outlet: bool,
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl Layout {
    /// A layout backed by a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parent: None,
            render: Arc::new(render),
            missing_outlet: false,
        }
    }

    /// A layout that substitutes content for every [`OUTLET`] marker.
    ///
    /// ```
    /// use switchyard::layout::Layout;
    ///
    /// let page = Layout::template("page", "<main>{{outlet}}</main>");
    /// assert_eq!(page.render("hi"), "<main>hi</main>");
    /// ```
    pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        let missing_outlet = !template.contains(OUTLET);
        Self {
            missing_outlet,
            ..Self::new(name, move |content| template.replace(OUTLET, content))
        }
    }

    /// Nests this layout inside `parent`.
    #[must_use]
    pub fn within(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Layout name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent layout name.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Applies this layout alone.
    #[must_use]
    pub fn render(&self, content: &str) -> String {
        (self.render)(content)
    }
}

/// Validated layouts, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<String, Layout>,
}

impl LayoutRegistry {
    /// Validates and indexes `layouts`.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::DuplicateLayout`] for a repeated name
    /// - [`AssemblyError::MissingOutlet`] for a template without [`OUTLET`]
    /// - [`AssemblyError::UnknownLayout`] for an unregistered parent
    /// - [`AssemblyError::LayoutCycle`] when nesting loops
    pub fn new(layouts: Vec<Layout>) -> Result<Self, AssemblyError> {
        let mut map = HashMap::with_capacity(layouts.len());
        for layout in layouts {
            if layout.missing_outlet {
                return Err(AssemblyError::MissingOutlet(layout.name));
            }
            if map.contains_key(&layout.name) {
                return Err(AssemblyError::DuplicateLayout(layout.name));
            }
            map.insert(layout.name.clone(), layout);
        }

        let registry = Self { layouts: map };
        for layout in registry.layouts.values() {
            if let Some(parent) = layout.parent() {
                if !registry.layouts.contains_key(parent) {
                    return Err(AssemblyError::UnknownLayout {
                        layout: parent.to_string(),
                        referrer: format!("layout `{}`", layout.name),
                    });
                }
            }
            registry.chain(&layout.name)?;
        }
        Ok(registry)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    /// Fails unless `name` is registered.
    pub fn require(&self, name: &str, referrer: impl FnOnce() -> String) -> Result<(), AssemblyError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(AssemblyError::UnknownLayout {
                layout: name.to_string(),
                referrer: referrer(),
            })
        }
    }

    /// Names from `name` outwards.
    pub fn chain(&self, name: &str) -> Result<Vec<&str>, AssemblyError> {
        let mut chain: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);

        while let Some(layout_name) = current {
            if !seen.insert(layout_name) {
                let mut cycle: Vec<String> = chain.iter().map(|n| (*n).to_string()).collect();
                cycle.push(layout_name.to_string());
                return Err(AssemblyError::LayoutCycle(cycle));
            }
            let layout = self.layouts.get(layout_name).ok_or_else(|| AssemblyError::UnknownLayout {
                layout: layout_name.to_string(),
                referrer: "layout chain".to_string(),
            })?;
            chain.push(layout.name.as_str());
            current = layout.parent();
        }
        Ok(chain)
    }

    /// Wraps `content` in `name` and all of its ancestors.
    ///
    /// Returns `None` if the layout is unknown.
    #[must_use]
    pub fn compose(&self, name: &str, content: &str) -> Option<String> {
        let chain = self.chain(name).ok()?;
        let mut output = content.to_string();
        for layout_name in chain {
            output = self.layouts.get(layout_name)?.render(&output);
        }
        Some(output)
    }

    /// Number of layouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns true if there are no layouts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
