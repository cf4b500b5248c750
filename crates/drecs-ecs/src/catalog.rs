//! The [`Catalog`]: every component kind and entity template an
//! [`EntityStore`](crate::store::EntityStore) can instantiate from.

use crate::component::{AttrMap, Attributes, ComponentKind, ComponentRegistry};
use crate::template::{Overrides, TemplateDef, TemplateRegistry};
use crate::EcsError;

/// Component kinds plus entity templates.
///
/// Filled during startup, then only read. Store operations borrow it
/// immutably.
#[derive(Debug, Default)]
pub struct Catalog {
    components: ComponentRegistry,
    templates: TemplateRegistry,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_component(&mut self, name: &str, defaults: AttrMap) -> bool {
        self.components.register(name, defaults)
    }

    pub fn register_template(&mut self, name: &str, def: TemplateDef) -> bool {
        self.templates.register(name, def)
    }

    pub fn component(&self, name: &str) -> Result<&ComponentKind, EcsError> {
        self.components.get(name)
    }

    pub fn template(&self, name: &str) -> Result<&TemplateDef, EcsError> {
        self.templates.get(name)
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Fresh attribute data for `kind`: the registered defaults with each
    /// override layer applied in order (later layers win).
    pub fn instantiate_component(
        &self,
        kind: &str,
        layers: &[Option<&AttrMap>],
    ) -> Result<Attributes, EcsError> {
        let mut attrs = self.component(kind)?.instantiate();
        for layer in layers.iter().flatten() {
            attrs.merge(layer)?;
        }
        Ok(attrs)
    }

    /// Check that `overrides` only name registered kinds and valid attributes.
    pub fn check_overrides(&self, overrides: &Overrides) -> Result<(), EcsError> {
        for (kind, attrs) in overrides.iter() {
            self.instantiate_component(kind, &[Some(attrs)])?;
        }
        Ok(())
    }

    /// Check that a template only references registered kinds and valid
    /// attributes.
    pub fn check_template(&self, def: &TemplateDef) -> Result<(), EcsError> {
        for kind in def.attached_kinds() {
            self.instantiate_component(kind, &[def.overrides().get(kind)])?;
        }
        Ok(())
    }

    /// Check every registered template. Reports the first failure in
    /// template-name order.
    pub fn validate(&self) -> Result<(), EcsError> {
        for name in self.templates.registered_names() {
            let def = self.templates.get(name)?;
            self.check_template(def)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::attrs;

    #[test]
    fn layers_apply_in_order() {
        let mut cat = Catalog::new();
        cat.register_component("position", attrs([("x", 0), ("y", 0)]));
        let a = attrs([("x", 1), ("y", 1)]);
        let b = attrs([("x", 2)]);
        let out = cat
            .instantiate_component("position", &[Some(&a), None, Some(&b)])
            .unwrap();
        assert_eq!(out.int("x"), Some(2));
        assert_eq!(out.int("y"), Some(1));
    }

    #[test]
    fn validate_reports_unregistered_kinds() {
        let mut cat = Catalog::new();
        cat.register_component("position", attrs([("x", 0)]));
        cat.register_template("player", TemplateDef::new(["position", "accel"]));
        let err = cat.validate().unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent { ref name, .. } if name == "accel"));
    }

    #[test]
    fn validate_reports_bad_template_overrides() {
        let mut cat = Catalog::new();
        cat.register_component("position", attrs([("x", 0)]));
        cat.register_template(
            "player",
            TemplateDef::new(["position"]).with_override("position", "z", 1),
        );
        assert!(matches!(cat.validate(), Err(EcsError::UnknownAttribute { .. })));
    }
}
