//! The module: the closed set of declarations processed per invocation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::ids::{ContainerId, DeclId, TypeParamId, ValueId};
use crate::index_vec::IndexVec;
use crate::interner::{Interner, Name};
use crate::ir::decl::{Declaration, Parent};
use crate::ir::expr::Expr;
use crate::ir::fold::nested_functions;
use crate::types::TypeInterner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKind {
    /// A source file. `package` is dot separated, empty for the root package.
    File { package: String },
    Class { name: Name },
}

/// The expressions owned by one declaration, taken out for folding.
#[derive(Debug, Clone, Default)]
pub struct DeclExprs {
    /// One entry per value parameter.
    pub defaults: Vec<Option<Expr>>,
    pub body: Option<Expr>,
}

/// A file or class holding declarations.
#[derive(Debug, Clone)]
pub struct Container {
    pub kind: ContainerKind,
    pub parent: Option<ContainerId>,
    /// Declarations in source order.
    pub members: Vec<DeclId>,
    /// Nested classes in source order.
    pub classes: Vec<ContainerId>,
}

/// An IR module.
///
/// Declarations live in an append-only arena. Rewrites allocate new
/// declarations and swap them into container member lists; the old ones
/// stay allocated but become detached at the next [`Module::patch_parents`].
pub struct Module {
    pub name: Name,
    /// String interner (shared, thread-safe).
    pub interner: Arc<Interner>,
    pub types: TypeInterner,
    pub decls: IndexVec<DeclId, Declaration>,
    pub containers: IndexVec<ContainerId, Container>,
    /// Root files in source order.
    pub files: Vec<ContainerId>,
    values: IndexVec<ValueId, Name>,
    type_params: IndexVec<TypeParamId, Name>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self::with_interner(Arc::new(Interner::new()), name)
    }

    /// Create with a shared interner.
    pub fn with_interner(interner: Arc<Interner>, name: &str) -> Self {
        Self {
            name: interner.intern(name),
            interner,
            types: TypeInterner::new(),
            decls: IndexVec::new(),
            containers: IndexVec::new(),
            files: Vec::new(),
            values: IndexVec::new(),
            type_params: IndexVec::new(),
        }
    }

    // ========================================================================
    // Names and symbols
    // ========================================================================

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn str(&self, name: Name) -> String {
        self.interner.str(name).to_string()
    }

    pub fn new_value(&mut self, name: Name) -> ValueId {
        self.values.push(name)
    }

    pub fn value_name(&self, value: ValueId) -> Name {
        self.values[value]
    }

    pub fn new_type_param(&mut self, name: Name) -> TypeParamId {
        self.type_params.push(name)
    }

    pub fn type_param_name(&self, param: TypeParamId) -> Name {
        self.type_params[param]
    }

    // ========================================================================
    // Containers
    // ========================================================================

    pub fn add_file(&mut self, package: &str) -> ContainerId {
        let id = self.containers.push(Container {
            kind: ContainerKind::File {
                package: package.to_string(),
            },
            parent: None,
            members: Vec::new(),
            classes: Vec::new(),
        });
        self.files.push(id);
        id
    }

    pub fn add_class(&mut self, parent: ContainerId, name: &str) -> ContainerId {
        let name = self.intern(name);
        let id = self.containers.push(Container {
            kind: ContainerKind::Class { name },
            parent: Some(parent),
            members: Vec::new(),
            classes: Vec::new(),
        });
        self.containers[parent].classes.push(id);
        id
    }

    pub fn container(&self, id: ContainerId) -> &Container {
        &self.containers[id]
    }

    /// Containers in tree order: each file followed by its classes,
    /// depth first.
    pub fn containers_in_order(&self) -> Vec<ContainerId> {
        fn visit(module: &Module, id: ContainerId, out: &mut Vec<ContainerId>) {
            out.push(id);
            for &class in &module.containers[id].classes {
                visit(module, class, out);
            }
        }

        let mut out = Vec::new();
        for &file in &self.files {
            visit(self, file, &mut out);
        }
        out
    }

    /// Package of the file enclosing `container`.
    pub fn package_of(&self, mut container: ContainerId) -> String {
        loop {
            let c = &self.containers[container];
            match (&c.kind, c.parent) {
                (ContainerKind::File { package }, _) => return package.clone(),
                (ContainerKind::Class { .. }, Some(parent)) => container = parent,
                (ContainerKind::Class { .. }, None) => return String::new(),
            }
        }
    }

    /// Class names from the outermost class down to `container`.
    pub fn class_path(&self, mut container: ContainerId) -> Vec<Name> {
        let mut path = Vec::new();
        loop {
            let c = &self.containers[container];
            if let ContainerKind::Class { name } = c.kind {
                path.push(name);
            }
            match c.parent {
                Some(parent) => container = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Names already taken in `container`: members and nested classes.
    pub fn names_in(&self, container: ContainerId) -> HashSet<Name> {
        let c = &self.containers[container];
        let members = c.members.iter().map(|&d| self.decls[d].name);
        let classes = c.classes.iter().filter_map(|&k| match self.containers[k].kind {
            ContainerKind::Class { name } => Some(name),
            ContainerKind::File { .. } => None,
        });
        members.chain(classes).collect()
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Allocate a declaration without placing it in a container.
    pub fn alloc_decl(&mut self, decl: Declaration) -> DeclId {
        self.decls.push(decl)
    }

    pub fn add_member(&mut self, container: ContainerId, decl: DeclId) {
        self.containers[container].members.push(decl);
        self.decls[decl].parent = Parent::Container(container);
    }

    /// Swap `old` for `new` in the member list. Returns false if `old` is
    /// not a member.
    pub fn replace_member(&mut self, container: ContainerId, old: DeclId, new: DeclId) -> bool {
        let members = &mut self.containers[container].members;
        match members.iter().position(|&m| m == old) {
            Some(pos) => {
                members[pos] = new;
                self.decls[new].parent = Parent::Container(container);
                true
            }
            None => false,
        }
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.decls[id]
    }

    pub fn decl_name(&self, id: DeclId) -> String {
        self.str(self.decls[id].name)
    }

    /// Move the default values and body out of `decl`.
    pub fn take_exprs(&mut self, decl: DeclId) -> DeclExprs {
        let d = &mut self.decls[decl];
        DeclExprs {
            defaults: d.params.iter_mut().map(|p| p.default.take()).collect(),
            body: d.body.take(),
        }
    }

    /// Put back what [`Module::take_exprs`] took.
    pub fn put_exprs(&mut self, decl: DeclId, exprs: DeclExprs) {
        let d = &mut self.decls[decl];
        for (param, default) in d.params.iter_mut().zip(exprs.defaults) {
            param.default = default;
        }
        d.body = exprs.body;
    }

    /// Nearest enclosing container, looking through enclosing functions.
    pub fn container_of(&self, mut decl: DeclId) -> Option<ContainerId> {
        loop {
            match self.decls[decl].parent {
                Parent::Container(c) => return Some(c),
                Parent::Decl(outer) => decl = outer,
                Parent::Detached => return None,
            }
        }
    }

    pub fn is_attached(&self, decl: DeclId) -> bool {
        self.decls[decl].parent != Parent::Detached
    }

    /// Functions nested directly in a declaration's body and default values.
    pub fn nested_decls(&self, decl: DeclId) -> Vec<DeclId> {
        let d = &self.decls[decl];
        let mut nested = Vec::new();
        for param in &d.params {
            if let Some(default) = &param.default {
                nested.extend(nested_functions(default));
            }
        }
        if let Some(body) = &d.body {
            nested.extend(nested_functions(body));
        }
        nested
    }

    /// Every declaration reachable from the root files, parents before
    /// nested functions.
    pub fn reachable_decls(&self) -> Vec<DeclId> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        for container in self.containers_in_order() {
            for &member in &self.containers[container].members {
                stack.push(member);
                while let Some(decl) = stack.pop() {
                    out.push(decl);
                    let nested = self.nested_decls(decl);
                    stack.extend(nested.into_iter().rev());
                }
            }
        }
        out
    }

    /// Recompute every parent link from the container tree. Declarations
    /// no longer reachable become [`Parent::Detached`].
    pub fn patch_parents(&mut self) {
        for id in self.decls.indices() {
            self.decls[id].parent = Parent::Detached;
        }
        for container in self.containers_in_order() {
            let members = self.containers[container].members.clone();
            for member in members {
                self.decls[member].parent = Parent::Container(container);
                let mut stack = vec![member];
                while let Some(outer) = stack.pop() {
                    for nested in self.nested_decls(outer) {
                        self.decls[nested].parent = Parent::Decl(outer);
                        stack.push(nested);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::decl::DeclKind;
    use crate::ir::expr::{Expr, ExprKind};
    use crate::types::Ty;

    #[test]
    fn test_paths() {
        let mut module = Module::new("app");
        let file = module.add_file("com.example.ui");
        let outer = module.add_class(file, "Screen");
        let inner = module.add_class(outer, "Header");

        assert_eq!(module.package_of(inner), "com.example.ui");
        let path: Vec<_> = module
            .class_path(inner)
            .into_iter()
            .map(|n| module.str(n))
            .collect();
        assert_eq!(path, vec!["Screen", "Header"]);
        assert_eq!(module.containers_in_order(), vec![file, outer, inner]);
    }

    #[test]
    fn test_patch_parents_detaches_replaced() {
        let mut module = Module::new("app");
        let file = module.add_file("");
        let name = module.intern("Content");

        let lambda = module.alloc_decl(Declaration::new(name, DeclKind::Function, Ty::UNIT));
        let mut old = Declaration::new(name, DeclKind::Function, Ty::UNIT);
        old.body = Some(Expr::new(ExprKind::Function(lambda), Ty::ANY));
        let old = module.alloc_decl(old);
        module.add_member(file, old);

        let new = module.alloc_decl(module.decl(old).clone());
        assert!(module.replace_member(file, old, new));
        module.patch_parents();

        assert!(!module.is_attached(old));
        assert_eq!(module.decl(new).parent, Parent::Container(file));
        assert_eq!(module.decl(lambda).parent, Parent::Decl(new));
        assert_eq!(module.container_of(lambda), Some(file));
        assert_eq!(module.reachable_decls(), vec![new, lambda]);
    }
}
