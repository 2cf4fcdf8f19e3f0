//! Symbol and type resolution.
//!
//! The device describes a variable with a symbol entry naming its type, and
//! each type with a data type entry whose members and array elements again
//! name types. Resolution walks those names until only leaves remain and
//! returns a self-contained [`TypeNode`] tree.
//!
//! In the resolved tree every node's `type_name` is the declared type name
//! it was resolved from, structure members carry their member name, offset
//! and comment, and array nodes hold all dimensions with `size` being the
//! element size.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use adsprims_types::{AdsDataType, Symbol, TypeNode};
use tracing::trace;

use crate::error::{ClientError, Result};

/// Where declarations come from. Implemented by [`AdsClient`](crate::AdsClient)
/// over the wire and by in-memory tables in tests.
pub trait DeclarationSource: Send + Sync {
    /// Symbol entry for a variable path such as `MAIN.counter`.
    fn symbol(&self, path: &str, port: u16) -> impl Future<Output = Result<Symbol>> + Send;

    /// Unresolved data type entry for a type name.
    fn data_type(&self, name: &str, port: u16) -> impl Future<Output = Result<TypeNode>> + Send;
}

/// Resolve a variable path to its symbol and full type tree.
///
/// The root node has an empty name, the symbol's type name and offset 0.
pub async fn resolve<S>(
    source: &S,
    path: &str,
    port: u16,
    max_depth: usize,
) -> Result<(Symbol, TypeNode)>
where
    S: DeclarationSource,
{
    let symbol = source.symbol(path, port).await?;
    let mut root = resolve_type(source, &symbol.type_name, port, max_depth).await?;
    root.name.clear();
    root.offset = 0;
    trace!(path, type_name = %symbol.type_name, "resolved symbol");
    Ok((symbol, root))
}

/// Resolve a type name to its full tree.
pub async fn resolve_type<S>(
    source: &S,
    type_name: &str,
    port: u16,
    max_depth: usize,
) -> Result<TypeNode>
where
    S: DeclarationSource,
{
    let mut resolver = Resolver {
        source,
        port,
        max_depth,
        declarations: HashMap::new(),
    };
    resolver.expand(type_name, 0).await
}

type Expansion<'a> = Pin<Box<dyn Future<Output = Result<TypeNode>> + Send + 'a>>;

struct Resolver<'s, S> {
    source: &'s S,
    port: u16,
    max_depth: usize,
    /// Declarations fetched during this resolution only.
    declarations: HashMap<String, TypeNode>,
}

impl<'s, S> Resolver<'s, S>
where
    S: DeclarationSource,
{
    async fn declaration(&mut self, type_name: &str) -> Result<TypeNode> {
        if let Some(decl) = self.declarations.get(type_name) {
            return Ok(decl.clone());
        }
        let decl = self.source.data_type(type_name, self.port).await?;
        self.declarations
            .insert(type_name.to_string(), decl.clone());
        Ok(decl)
    }

    fn expand<'a>(&'a mut self, type_name: &'a str, depth: usize) -> Expansion<'a>
    where
        's: 'a,
    {
        Box::pin(async move {
            if depth > self.max_depth {
                return Err(ClientError::TypeDepthExceeded {
                    type_name: type_name.to_string(),
                    max_depth: self.max_depth,
                });
            }

            let mut node = self.declaration(type_name).await?;
            let base_type = std::mem::take(&mut node.type_name);

            if node.is_struct() {
                let members = std::mem::take(&mut node.sub_items);
                for member in members {
                    let mut resolved = self.expand(&member.type_name, depth + 1).await?;
                    resolved.name = member.name;
                    resolved.offset = member.offset;
                    resolved.comment = member.comment;
                    resolved.type_name = member.type_name;
                    node.sub_items.push(resolved);
                }
            } else if node.is_array() {
                let element = self.expand(&base_type, depth + 1).await?;
                let mut dims = std::mem::take(&mut node.array_dims);
                dims.extend(element.array_dims.iter().copied());
                node = TypeNode {
                    name: node.name,
                    offset: node.offset,
                    comment: node.comment,
                    array_dims: dims,
                    ..element
                };
            } else if is_alias(&node, &base_type) {
                // Alias of a non-primitive type: the target carries the layout.
                let target = self.expand(&base_type, depth + 1).await?;
                node = TypeNode {
                    name: node.name,
                    offset: node.offset,
                    comment: node.comment,
                    attributes: node.attributes,
                    ..target
                };
            }

            node.type_name = type_name.to_string();
            Ok(node)
        })
    }
}

fn is_alias(node: &TypeNode, base_type: &str) -> bool {
    node.kind() == AdsDataType::BigType
        && !node.is_enum()
        && !base_type.is_empty()
        && base_type != node.name
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use adsprims_frame::AdsReturnCode;
    use adsprims_types::ArrayDim;

    use super::*;

    #[derive(Default)]
    struct Table {
        symbols: HashMap<String, Symbol>,
        types: HashMap<String, TypeNode>,
        type_lookups: AtomicUsize,
    }

    impl Table {
        fn with_symbol(mut self, name: &str, type_name: &str, size: u32) -> Self {
            self.symbols.insert(
                name.to_string(),
                Symbol {
                    index_group: 0x4040,
                    index_offset: 0x100,
                    size,
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    ..Symbol::default()
                },
            );
            self
        }

        fn with_decl(mut self, node: TypeNode) -> Self {
            self.types.insert(node.name.clone(), node);
            self
        }
    }

    impl DeclarationSource for Table {
        async fn symbol(&self, path: &str, _port: u16) -> Result<Symbol> {
            self.symbols
                .get(path)
                .cloned()
                .ok_or(ClientError::Ads(AdsReturnCode::SYMBOL_NOT_FOUND))
        }

        async fn data_type(&self, name: &str, _port: u16) -> Result<TypeNode> {
            self.type_lookups.fetch_add(1, Ordering::SeqCst);
            self.types
                .get(name)
                .cloned()
                .ok_or(ClientError::Ads(AdsReturnCode::SYMBOL_NOT_FOUND))
        }
    }

    fn leaf(name: &str, kind: AdsDataType, size: u32) -> TypeNode {
        TypeNode {
            name: name.to_string(),
            data_type: kind.code(),
            size,
            ..TypeNode::default()
        }
    }

    fn member(name: &str, type_name: &str, offset: u32, size: u32) -> TypeNode {
        TypeNode {
            name: name.to_string(),
            type_name: type_name.to_string(),
            offset,
            size,
            comment: format!("{name} comment"),
            ..TypeNode::default()
        }
    }

    fn base_types() -> Table {
        Table::default()
            .with_decl(leaf("INT", AdsDataType::Int16, 2))
            .with_decl(leaf("REAL", AdsDataType::Real32, 4))
            .with_decl(leaf("BOOL", AdsDataType::Bit, 1))
    }

    #[tokio::test]
    async fn resolves_primitive_root() {
        let table = base_types().with_symbol("MAIN.counter", "INT", 2);
        let (symbol, node) = resolve(&table, "MAIN.counter", 851, 64).await.unwrap();
        assert_eq!(symbol.index_offset, 0x100);
        assert_eq!(node.name, "");
        assert_eq!(node.type_name, "INT");
        assert_eq!(node.offset, 0);
        assert_eq!(node.kind(), AdsDataType::Int16);
    }

    #[tokio::test]
    async fn resolves_struct_members_with_member_identity() {
        let st = TypeNode {
            name: "ST_Pair".to_string(),
            data_type: AdsDataType::BigType.code(),
            size: 8,
            sub_items: vec![member("a", "INT", 0, 2), member("b", "REAL", 4, 4)],
            ..TypeNode::default()
        };
        let table = base_types().with_decl(st).with_symbol("MAIN.pair", "ST_Pair", 8);

        let (_, node) = resolve(&table, "MAIN.pair", 851, 64).await.unwrap();
        assert_eq!(node.type_name, "ST_Pair");
        assert_eq!(node.sub_items.len(), 2);
        let b = &node.sub_items[1];
        assert_eq!(b.name, "b");
        assert_eq!(b.offset, 4);
        assert_eq!(b.comment, "b comment");
        assert_eq!(b.type_name, "REAL");
        assert_eq!(b.kind(), AdsDataType::Real32);
    }

    #[tokio::test]
    async fn array_dims_are_prepended_to_element_dims() {
        let inner = TypeNode {
            name: "T_Row".to_string(),
            type_name: "INT".to_string(),
            data_type: AdsDataType::Int16.code(),
            size: 6,
            array_dims: vec![ArrayDim {
                start_index: 0,
                length: 3,
            }],
            ..TypeNode::default()
        };
        let outer = TypeNode {
            name: "T_Matrix".to_string(),
            type_name: "T_Row".to_string(),
            data_type: AdsDataType::Int16.code(),
            size: 12,
            array_dims: vec![ArrayDim {
                start_index: 1,
                length: 2,
            }],
            ..TypeNode::default()
        };
        let table = base_types()
            .with_decl(inner)
            .with_decl(outer)
            .with_symbol("MAIN.m", "T_Matrix", 12);

        let (_, node) = resolve(&table, "MAIN.m", 851, 64).await.unwrap();
        assert_eq!(
            node.array_dims,
            vec![
                ArrayDim {
                    start_index: 1,
                    length: 2
                },
                ArrayDim {
                    start_index: 0,
                    length: 3
                }
            ]
        );
        assert_eq!(node.size, 2);
        assert_eq!(node.byte_size(), Some(12));
        assert_eq!(node.type_name, "T_Matrix");
    }

    #[tokio::test]
    async fn self_referencing_type_hits_depth_bound() {
        let looped = TypeNode {
            name: "ST_Loop".to_string(),
            data_type: AdsDataType::BigType.code(),
            size: 4,
            sub_items: vec![member("next", "ST_Loop", 0, 4)],
            ..TypeNode::default()
        };
        let table = base_types().with_decl(looped).with_symbol("MAIN.l", "ST_Loop", 4);

        let err = resolve(&table, "MAIN.l", 851, 8).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::TypeDepthExceeded { max_depth: 8, .. }
        ));
    }

    #[tokio::test]
    async fn declarations_are_fetched_once_per_resolution() {
        let st = TypeNode {
            name: "ST_Three".to_string(),
            data_type: AdsDataType::BigType.code(),
            size: 6,
            sub_items: vec![
                member("x", "INT", 0, 2),
                member("y", "INT", 2, 2),
                member("z", "INT", 4, 2),
            ],
            ..TypeNode::default()
        };
        let table = base_types().with_decl(st).with_symbol("MAIN.t", "ST_Three", 6);

        resolve(&table, "MAIN.t", 851, 64).await.unwrap();
        assert_eq!(table.type_lookups.load(Ordering::SeqCst), 2);
        resolve(&table, "MAIN.t", 851, 64).await.unwrap();
        assert_eq!(table.type_lookups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn alias_of_struct_follows_target() {
        let st = TypeNode {
            name: "ST_Pair".to_string(),
            data_type: AdsDataType::BigType.code(),
            size: 8,
            sub_items: vec![member("a", "INT", 0, 2), member("b", "REAL", 4, 4)],
            ..TypeNode::default()
        };
        let alias = TypeNode {
            name: "T_Pair".to_string(),
            type_name: "ST_Pair".to_string(),
            data_type: AdsDataType::BigType.code(),
            size: 8,
            ..TypeNode::default()
        };
        let table = base_types()
            .with_decl(st)
            .with_decl(alias)
            .with_symbol("MAIN.p", "T_Pair", 8);

        let (_, node) = resolve(&table, "MAIN.p", 851, 64).await.unwrap();
        assert_eq!(node.type_name, "T_Pair");
        assert_eq!(node.sub_items.len(), 2);
    }

    #[tokio::test]
    async fn missing_symbol_is_ads_error() {
        let table = base_types();
        let err = resolve(&table, "MAIN.nope", 851, 64).await.unwrap_err();
        assert_eq!(err.ads_code(), Some(AdsReturnCode::SYMBOL_NOT_FOUND));
    }
}
