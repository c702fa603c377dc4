/// Classlike resolution.
///
/// Builds the flattened view of a classlike by merging its own members
/// with everything reachable through traits, parents, and interfaces.
/// Precedence on a name collision, most specific first:
///
///   own members > trait members > parent chain > interfaces
///
/// Between the traits of one `use` list an `insteadof` adaptation picks the
/// winner, otherwise the trait listed first wins.  `as` adaptations publish
/// an extra copy of a trait method under a new name or visibility.
///
/// Interface constants are merged by union: the same constant name coming
/// from two unrelated interfaces appears twice.
///
/// Cycles in the parent or trait graph raise
/// [`ResolutionError::CircularDependency`] with the offending chain.
use std::collections::HashSet;

use crate::Backend;
use crate::errors::ResolutionError;
use crate::types::*;
use crate::util::lookup_key;

impl Backend {
    /// Resolve `fqcn` into its flattened view.
    pub fn resolve_classlike(&self, fqcn: &str) -> Result<FlattenedClasslikeInfo, ResolutionError> {
        let mut visiting = Vec::new();
        self.resolve_visiting(fqcn, &mut visiting)
    }

    /// Like [`resolve_classlike`](Self::resolve_classlike), but any failure
    /// is logged and reported as `None`.
    pub(crate) fn flattened(&self, fqcn: &str) -> Option<FlattenedClasslikeInfo> {
        match self.resolve_classlike(fqcn) {
            Ok(info) => Some(info),
            Err(ResolutionError::UnknownClasslike(_)) => None,
            Err(err) => {
                tracing::warn!("could not resolve {}: {}", fqcn, err);
                None
            }
        }
    }

    fn resolve_visiting(
        &self,
        fqcn: &str,
        visiting: &mut Vec<String>,
    ) -> Result<FlattenedClasslikeInfo, ResolutionError> {
        let key = lookup_key(fqcn);
        if let Some(pos) = visiting.iter().position(|v| lookup_key(v) == key) {
            let mut chain = visiting[pos..].to_vec();
            chain.push(fqcn.to_string());
            return Err(ResolutionError::CircularDependency {
                fqcn: fqcn.to_string(),
                chain,
            });
        }
        if visiting.len() >= self.config.resolution.max_depth {
            return Err(ResolutionError::DepthExceeded(fqcn.to_string()));
        }

        let classlike = self
            .store
            .classlike(fqcn)
            .ok_or_else(|| ResolutionError::UnknownClasslike(fqcn.to_string()))?;

        visiting.push(classlike.fqcn.clone());
        let result = self.flatten(classlike, visiting);
        visiting.pop();
        result
    }

    /// Resolve an ancestor.  Ancestors missing from the index are skipped;
    /// every other error propagates.
    fn resolve_ancestor(
        &self,
        fqcn: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Option<FlattenedClasslikeInfo>, ResolutionError> {
        match self.resolve_visiting(fqcn, visiting) {
            Ok(info) => Ok(Some(info)),
            Err(ResolutionError::UnknownClasslike(name)) => {
                tracing::debug!("ancestor {} is not indexed", name);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn flatten(
        &self,
        classlike: ClassLikeInfo,
        visiting: &mut Vec<String>,
    ) -> Result<FlattenedClasslikeInfo, ResolutionError> {
        let mut merged = FlattenedClasslikeInfo {
            parents: Vec::new(),
            interfaces: Vec::new(),
            traits: Vec::new(),
            constants: classlike.constants.iter().cloned().map(FlattenedMember::own).collect(),
            properties: classlike.properties.iter().cloned().map(FlattenedMember::own).collect(),
            methods: classlike.methods.iter().cloned().map(FlattenedMember::own).collect(),
            classlike,
        };

        // 1. Traits, with their adaptations.
        let mut trait_infos = Vec::new();
        for trait_fqcn in merged.classlike.traits.clone() {
            push_unique(&mut merged.traits, &trait_fqcn);
            if let Some(info) = self.resolve_ancestor(&trait_fqcn, visiting)? {
                for nested in &info.traits {
                    push_unique(&mut merged.traits, nested);
                }
                trait_infos.push(info);
            }
        }
        merge_traits(&mut merged, &trait_infos);

        // 2. The parent chain.  A class has at most one parent, an
        //    interface may extend several and merges them like implemented
        //    interfaces.
        let is_interface = merged.classlike.kind == ClassLikeKind::Interface;
        let mut interface_sources = HashSet::new();
        for parent_fqcn in merged.classlike.parents.clone() {
            push_unique(&mut merged.parents, &parent_fqcn);
            let Some(parent) = self.resolve_ancestor(&parent_fqcn, visiting)? else {
                continue;
            };
            for name in &parent.parents {
                push_unique(&mut merged.parents, name);
            }
            for name in &parent.interfaces {
                push_unique(&mut merged.interfaces, name);
            }
            for name in &parent.traits {
                push_unique(&mut merged.traits, name);
            }
            if is_interface {
                interface_sources.insert(lookup_key(parent.fqcn()));
                for name in &parent.parents {
                    interface_sources.insert(lookup_key(name));
                }
                merge_interface(&mut merged, &parent, &interface_sources);
            } else {
                merge_inherited(&mut merged, &parent);
            }
        }

        // 3. Implemented interfaces.
        for interface_fqcn in merged.classlike.interfaces.clone() {
            push_unique(&mut merged.interfaces, &interface_fqcn);
            let Some(interface) = self.resolve_ancestor(&interface_fqcn, visiting)? else {
                continue;
            };
            interface_sources.insert(lookup_key(interface.fqcn()));
            for name in interface.parents.iter().chain(&interface.interfaces) {
                push_unique(&mut merged.interfaces, name);
                interface_sources.insert(lookup_key(name));
            }
            merge_interface(&mut merged, &interface, &interface_sources);
        }

        Ok(merged)
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        list.push(name.to_string());
    }
}

fn same_class(a: &str, b: &str) -> bool {
    a.trim_start_matches('\\')
        .eq_ignore_ascii_case(b.trim_start_matches('\\'))
}

/// Record on `existing` that it shadows a member declared by `declaring`.
fn mark_override<T>(existing: &mut FlattenedMember<T>, declaring: &str) {
    if existing.overrides.is_none() {
        existing.overrides = Some(declaring.to_string());
    }
}

fn merge_traits(merged: &mut FlattenedClasslikeInfo, traits: &[FlattenedClasslikeInfo]) {
    let precedences = merged.classlike.trait_precedences.clone();

    for trait_info in traits {
        let trait_fqcn = trait_info.fqcn();

        for method in &trait_info.methods {
            let name = &method.member.name;
            let loses = precedences.iter().any(|p| {
                p.method.eq_ignore_ascii_case(name)
                    && p.insteadof.iter().any(|t| same_class(t, trait_fqcn))
            });
            if loses {
                continue;
            }
            match merged
                .methods
                .iter_mut()
                .find(|m| m.member.name.eq_ignore_ascii_case(name))
            {
                Some(existing) if existing.origin == MemberOrigin::Own => {
                    mark_override(existing, &method.member.declaring_fqcn);
                }
                // An earlier trait already supplied it.
                Some(_) => {}
                None => merged
                    .methods
                    .push(FlattenedMember::inherited(method.member.clone())),
            }
        }

        for property in &trait_info.properties {
            match merged
                .properties
                .iter_mut()
                .find(|p| p.member.name == property.member.name)
            {
                Some(existing) => mark_override(existing, &property.member.declaring_fqcn),
                None => merged
                    .properties
                    .push(FlattenedMember::inherited(property.member.clone())),
            }
        }

        for constant in &trait_info.constants {
            if !merged
                .constants
                .iter()
                .any(|c| c.member.name == constant.member.name)
            {
                merged
                    .constants
                    .push(FlattenedMember::inherited(constant.member.clone()));
            }
        }
    }

    for alias in merged.classlike.trait_aliases.clone() {
        let source = traits
            .iter()
            .filter(|t| {
                alias
                    .trait_fqcn
                    .as_deref()
                    .is_none_or(|fqcn| same_class(fqcn, t.fqcn()))
            })
            .find_map(|t| t.method(&alias.method));
        let Some(source) = source else {
            tracing::debug!(
                "trait alias source {} not found in {}",
                alias.method,
                merged.classlike.fqcn
            );
            continue;
        };

        match &alias.alias {
            Some(new_name) => {
                if merged.method(new_name).is_some() {
                    continue;
                }
                let mut copy = source.member.clone();
                copy.name = new_name.clone();
                if let Some(visibility) = alias.visibility {
                    copy.visibility = visibility;
                }
                merged.methods.push(FlattenedMember::inherited(copy));
            }
            // `m as protected;` only changes the visibility.
            None => {
                if let Some(visibility) = alias.visibility
                    && let Some(existing) = merged.methods.iter_mut().find(|m| {
                        m.origin == MemberOrigin::Inherited
                            && m.member.name.eq_ignore_ascii_case(&alias.method)
                    })
                {
                    existing.member.visibility = visibility;
                }
            }
        }
    }
}

/// Merge the members of a parent.  Private parent members are not
/// inherited.
fn merge_inherited(merged: &mut FlattenedClasslikeInfo, parent: &FlattenedClasslikeInfo) {
    let visible = |v: Visibility| v != Visibility::Private;

    for method in &parent.methods {
        if !visible(method.member.visibility) {
            continue;
        }
        match merged
            .methods
            .iter_mut()
            .find(|m| m.member.name.eq_ignore_ascii_case(&method.member.name))
        {
            Some(existing) => {
                mark_override(existing, &method.member.declaring_fqcn);
                fill_inherited_doc(
                    &mut existing.member.documentation,
                    &method.member.documentation,
                );
            }
            None => merged
                .methods
                .push(FlattenedMember::inherited(method.member.clone())),
        }
    }

    for property in &parent.properties {
        if !visible(property.member.visibility) {
            continue;
        }
        match merged
            .properties
            .iter_mut()
            .find(|p| p.member.name == property.member.name)
        {
            Some(existing) => {
                mark_override(existing, &property.member.declaring_fqcn);
                fill_inherited_doc(
                    &mut existing.member.documentation,
                    &property.member.documentation,
                );
            }
            None => merged
                .properties
                .push(FlattenedMember::inherited(property.member.clone())),
        }
    }

    // Only closer declarations shadow; a parent's unioned interface
    // constants are all kept.
    let closer = merged.constants.len();
    for constant in &parent.constants {
        if !visible(constant.member.visibility) {
            continue;
        }
        match merged.constants[..closer]
            .iter_mut()
            .find(|c| c.member.name == constant.member.name)
        {
            Some(existing) => mark_override(existing, &constant.member.declaring_fqcn),
            None => merged
                .constants
                .push(FlattenedMember::inherited(constant.member.clone())),
        }
    }
}

fn merge_interface(
    merged: &mut FlattenedClasslikeInfo,
    interface: &FlattenedClasslikeInfo,
    interface_sources: &HashSet<String>,
) {
    for method in &interface.methods {
        match merged
            .methods
            .iter_mut()
            .find(|m| m.member.name.eq_ignore_ascii_case(&method.member.name))
        {
            Some(existing) => fill_inherited_doc(
                &mut existing.member.documentation,
                &method.member.documentation,
            ),
            None => merged
                .methods
                .push(FlattenedMember::inherited(method.member.clone())),
        }
    }

    for constant in &interface.constants {
        let declaring = &constant.member.declaring_fqcn;
        let conflict = merged.constants.iter().any(|c| {
            c.member.name == constant.member.name
                && (same_class(&c.member.declaring_fqcn, declaring)
                    || !interface_sources.contains(&lookup_key(&c.member.declaring_fqcn)))
        });
        if !conflict {
            merged
                .constants
                .push(FlattenedMember::inherited(constant.member.clone()));
        }
    }
}

/// Replace an `{@inheritDoc}` placeholder with the ancestor's text.
fn fill_inherited_doc(own: &mut Documentation, ancestor: &Documentation) {
    if own.inherits_documentation && ancestor.has_docblock {
        *own = ancestor.clone();
    }
}
