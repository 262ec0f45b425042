// Resolution of edge target names to element identifiers
//
// Call and reference targets are matched by name, preferring the source's own
// file. A dotted target (`obj.method`) is only matched through its receiver:
// the enclosing class for `self`/`this`/`cls`, a known class, or a file the
// source imports. Import targets are matched against known file paths.
// Candidates come out of ordered sets, so the same input always resolves the
// same way.

use crate::graph::RelationshipMap;
use crate::model::{normalize_path, ElementId, ElementKind, RelationshipKind, UnresolvedEdge};
use tracing::debug;

/// Receivers naming the enclosing instance or class
const SELF_RECEIVERS: [&str; 3] = ["self", "this", "cls"];

/// Identifier the edge's target name refers to, if it exists yet
pub fn resolve_target(map: &RelationshipMap, edge: &UnresolvedEdge) -> Option<ElementId> {
    let name = edge.target_name.trim();
    if is_identifier(name) {
        // Requeued edges carry their old target; it either comes back or stays pending
        return resolve_explicit(map, name);
    }
    match edge.kind {
        RelationshipKind::Imports => resolve_module(map, edge.source.path(), name)
            .or_else(|| pick(named(map, name), edge.source.path(), name)),
        _ => resolve_element(map, &edge.source, name),
    }
}

/// Names that already are identifiers (`path::name` or `file:path`)
fn is_identifier(name: &str) -> bool {
    name.contains("::") || name.starts_with("file:")
}

fn resolve_explicit(map: &RelationshipMap, name: &str) -> Option<ElementId> {
    let id = ElementId::from_raw(name);
    map.contains(&id).then_some(id)
}

/// Match a call/reference target by qualified or short name, then by receiver
fn resolve_element(map: &RelationshipMap, source: &ElementId, name: &str) -> Option<ElementId> {
    let candidates = named(map, name);
    if !candidates.is_empty() {
        return pick(candidates, source.path(), name);
    }

    let (receiver, member) = name.rsplit_once('.')?;
    if SELF_RECEIVERS.contains(&receiver) {
        resolve_on_self(map, source, member)
    } else {
        resolve_on_class(map, receiver, member).or_else(|| resolve_in_imports(map, source.path(), member))
    }
}

/// Non-file elements whose qualified or short name is `name`
fn named<'m>(map: &'m RelationshipMap, name: &str) -> Vec<&'m ElementId> {
    map.find_by_name(name).into_iter().filter(|id| !id.is_file()).collect()
}

fn pick(candidates: Vec<&ElementId>, source_file: &str, name: &str) -> Option<ElementId> {
    if let Some(local) = candidates.iter().find(|id| id.path() == source_file) {
        return Some((*local).clone());
    }
    if candidates.len() > 1 {
        debug!("Target '{}' is ambiguous across {} files, using {}", name, candidates.len(), candidates[0]);
    }
    candidates.first().map(|id| (*id).clone())
}

/// `self.save()` inside `User.rename` resolves to `User.save`, then to any
/// `save` declared in the same file
fn resolve_on_self(map: &RelationshipMap, source: &ElementId, member: &str) -> Option<ElementId> {
    let path = source.path();
    if !source.is_file() {
        let mut scope = source.name();
        while let Some((parent, _)) = scope.rsplit_once('.') {
            let id = ElementId::new(path, &format!("{}.{}", parent, member));
            if map.contains(&id) {
                return Some(id);
            }
            scope = parent;
        }
    }
    named(map, member)
        .into_iter()
        .find(|id| id.path() == path)
        .cloned()
}

/// `User.create()` where `User` is a known class
fn resolve_on_class(map: &RelationshipMap, receiver: &str, member: &str) -> Option<ElementId> {
    map.find_by_name(receiver)
        .into_iter()
        .filter(|id| map.element(id).is_some_and(|e| e.kind == ElementKind::Class))
        .map(|class| ElementId::new(class.path(), &format!("{}.{}", class.name(), member)))
        .find(|id| map.contains(id))
}

/// `utils.helper()` where the source file imports a file declaring `helper`;
/// top-level declarations win over nested ones
fn resolve_in_imports(map: &RelationshipMap, source_file: &str, member: &str) -> Option<ElementId> {
    let imported: Vec<ElementId> = map
        .outgoing_edges(&ElementId::file(source_file))
        .filter(|edge| edge.kind == RelationshipKind::Imports)
        .map(|edge| edge.target.clone())
        .collect();

    for file in imported {
        let ids = map.ids_in_file(file.path());
        let declared = ids
            .iter()
            .find(|id| !id.is_file() && id.name() == member)
            .or_else(|| ids.iter().find(|id| !id.is_file() && short_name(id) == member));
        if let Some(found) = declared {
            return Some(found.clone());
        }
    }
    None
}

fn short_name(id: &ElementId) -> &str {
    let name = id.name();
    name.rsplit_once('.').map_or(name, |(_, short)| short)
}

/// Match an import target against known files
fn resolve_module(map: &RelationshipMap, source_file: &str, module: &str) -> Option<ElementId> {
    let stems = module_stems(source_file, module);
    if stems.is_empty() {
        return None;
    }
    let files: Vec<&str> = map.files().collect();

    for stem in &stems {
        for path in &files {
            if *path == stem.as_str() || strip_extension(path) == stem.as_str() {
                return Some(ElementId::file(path));
            }
        }
        for path in &files {
            let bare = strip_extension(path);
            for package_entry in ["/__init__", "/index"] {
                if bare.strip_suffix(package_entry) == Some(stem.as_str()) {
                    return Some(ElementId::file(path));
                }
            }
        }
    }
    // Absolute module names may be rooted anywhere below the scan root
    for stem in &stems {
        let suffix = format!("/{}", stem);
        if let Some(path) = files.iter().find(|p| strip_extension(p).ends_with(&suffix)) {
            return Some(ElementId::file(path));
        }
    }
    None
}

/// Candidate path stems (no extension) an import may refer to
fn module_stems(source_file: &str, module: &str) -> Vec<String> {
    let module = module.trim().trim_matches(|c| c == '"' || c == '\'');
    if module.is_empty() {
        return Vec::new();
    }
    let source_dir: Vec<&str> = {
        let mut parts: Vec<&str> = source_file.split('/').collect();
        parts.pop();
        parts
    };

    if module.starts_with("./") || module.starts_with("../") {
        // JavaScript-style relative path
        let mut parts = source_dir.clone();
        for segment in module.split('/') {
            match segment {
                "." | "" => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        return vec![strip_extension(&parts.join("/")).to_string()];
    }

    if let Some(rest) = module.strip_prefix('.') {
        // Python-style relative import: one dot is the current package
        let extra_levels = rest.chars().take_while(|c| *c == '.').count();
        let rest = &rest[extra_levels..];
        let mut parts = source_dir.clone();
        for _ in 0..extra_levels {
            parts.pop();
        }
        if !rest.is_empty() {
            parts.extend(rest.split('.'));
        }
        return vec![parts.join("/")];
    }

    let mut stems = vec![normalize_path(&module.replace('.', "/"))];
    let literal = normalize_path(module);
    if !stems.contains(&literal) {
        stems.push(literal);
    }
    stems
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}
