//! Per-method accumulation of sequence points, blocks and locals.

use crate::{
    symbols::{
        entries::{CodeBlock, CodeBlockKind, LocalVariable, MethodDefinition, ScopeVariable},
        lineprogram::LineNumberEntry,
        store::SymbolStore,
        token::Token,
    },
    Error, Result,
};

/// Collects the debug information of one method while its body is being emitted.
///
/// Blocks are opened and closed like a stack; locals are attached to the innermost open block.
/// [`MethodBuilder::define_method`] checks that every block was closed, fills index gaps left by
/// [`MethodBuilder::add_code_block`], and hands the method to a store.
///
/// # Examples
///
/// ```rust
/// use symstore::{symbols::{builder::MethodBuilder, entries::CodeBlockKind}, Token};
///
/// let mut builder = MethodBuilder::new(Token::new(0x0600_0001), 1);
/// builder.mark_sequence_point(0, 1, 10, 5, false);
/// let block = builder.start_block(CodeBlockKind::Lexical, 2)?;
/// builder.add_local(0, "item");
/// builder.mark_sequence_point(2, 1, 11, 9, false);
/// builder.end_block(14)?;
///
/// let definition = builder.into_definition()?;
/// assert_eq!(definition.locals[0].block_index, block);
/// assert_eq!(definition.code_blocks[0].end_offset, 14);
/// # Ok::<(), symstore::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    token: Token,
    compile_unit: u32,
    namespace_id: u32,
    sequence_points: Vec<LineNumberEntry>,
    blocks: Vec<CodeBlock>,
    open_blocks: Vec<usize>,
    locals: Vec<LocalVariable>,
    scope_variables: Vec<ScopeVariable>,
    real_name: Option<String>,
    ambiguous_locals: bool,
}

impl MethodBuilder {
    /// Start a method in compile unit `compile_unit`.
    #[must_use]
    pub fn new(token: Token, compile_unit: u32) -> Self {
        MethodBuilder {
            token,
            compile_unit,
            namespace_id: 0,
            sequence_points: Vec::new(),
            blocks: Vec::new(),
            open_blocks: Vec::new(),
            locals: Vec::new(),
            scope_variables: Vec::new(),
            real_name: None,
            ambiguous_locals: false,
        }
    }

    /// Set the enclosing namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace_id: u32) -> Self {
        self.namespace_id = namespace_id;
        self
    }

    /// The method token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Sequence points recorded so far.
    #[must_use]
    pub fn sequence_points(&self) -> &[LineNumberEntry] {
        &self.sequence_points
    }

    /// Code blocks recorded so far, open or closed.
    #[must_use]
    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Record a sequence point without end position.
    pub fn mark_sequence_point(
        &mut self,
        offset: u32,
        file: u32,
        row: i32,
        column: i32,
        is_hidden: bool,
    ) {
        self.push_sequence_point(
            LineNumberEntry::new(file, row, offset, is_hidden).with_column(column),
        );
    }

    /// Record a sequence point with an end position.
    #[allow(clippy::too_many_arguments)]
    pub fn mark_sequence_point_with_end(
        &mut self,
        offset: u32,
        file: u32,
        row: i32,
        column: i32,
        end_row: i32,
        end_column: i32,
        is_hidden: bool,
    ) {
        self.push_sequence_point(
            LineNumberEntry::new(file, row, offset, is_hidden)
                .with_column(column)
                .with_end(end_row, end_column),
        );
    }

    /// Points at the same offset collapse into one: the later point wins only if it sorts
    /// strictly after the earlier one by row, then column.
    fn push_sequence_point(&mut self, entry: LineNumberEntry) {
        if let Some(last) = self.sequence_points.last_mut() {
            if last.offset == entry.offset {
                if (entry.row, entry.column) > (last.row, last.column) {
                    *last = entry;
                } else {
                    log::debug!(
                        "method {}: dropping sequence point {}:{} at offset {}",
                        self.token,
                        entry.row,
                        entry.column,
                        entry.offset
                    );
                }
                return;
            }
        }
        self.sequence_points.push(entry);
    }

    /// Open a block at `start_offset` inside the innermost open block and return its index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the next index overflows, or if the enclosing
    /// block's index does not fit the signed parent field.
    pub fn start_block(&mut self, kind: CodeBlockKind, start_offset: u32) -> Result<u32> {
        let index = self
            .blocks
            .iter()
            .map(|block| block.index)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| out_of_bounds_error!())?;
        let parent = match self.open_blocks.last() {
            Some(&position) => i32::try_from(self.blocks[position].index)
                .map_err(|_| out_of_bounds_error!())?,
            None => -1,
        };

        self.open_blocks.push(self.blocks.len());
        self.blocks
            .push(CodeBlock::new(index, parent, kind, start_offset, start_offset));
        Ok(index)
    }

    /// Close the innermost open block at `end_offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnbalancedBlock`] if no block is open.
    pub fn end_block(&mut self, end_offset: u32) -> Result<()> {
        let Some(position) = self.open_blocks.pop() else {
            return Err(Error::UnbalancedBlock(format!(
                "method {} closes a block at offset {} with none open",
                self.token, end_offset
            )));
        };
        self.blocks[position].end_offset = end_offset;
        Ok(())
    }

    /// Index of the innermost open block, 0 if none.
    #[must_use]
    pub fn current_block(&self) -> u32 {
        self.open_blocks
            .last()
            .map_or(0, |&position| self.blocks[position].index)
    }

    /// Add a finished block with an explicit index, e.g. when re-emitting an existing table.
    ///
    /// # Errors
    /// Returns [`crate::Error::Duplicate`] if the index is already used, or
    /// [`crate::Error::OutOfBounds`] for index 0.
    pub fn add_code_block(&mut self, block: CodeBlock) -> Result<()> {
        if block.index == 0 {
            return Err(out_of_bounds_error!());
        }
        if self.blocks.iter().any(|existing| existing.index == block.index) {
            return Err(Error::Duplicate(format!(
                "code block {} in method {}",
                block.index, self.token
            )));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Add a local in the innermost open block.
    pub fn add_local(&mut self, index: u32, name: &str) {
        let block_index = self.current_block();
        self.locals
            .push(LocalVariable::new(index, name, block_index));
    }

    /// Record that local `local` is captured by anonymous scope `scope`.
    pub fn add_scope_variable(&mut self, scope: u32, local: u32) {
        self.scope_variables.push(ScopeVariable::new(scope, local));
    }

    /// Record the source-level name of the method.
    pub fn set_real_name(&mut self, name: &str) {
        self.real_name = Some(name.to_string());
    }

    /// Force the ambiguous-locals flag.
    pub fn set_ambiguous_locals(&mut self, ambiguous_locals: bool) {
        self.ambiguous_locals = ambiguous_locals;
    }

    /// Finish the method.
    ///
    /// Blocks are ordered by index, and every index missing from `1..=max` is filled with a
    /// zero-length [`CodeBlockKind::CompilerGenerated`] placeholder.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnbalancedBlock`] if a block is still open.
    pub fn into_definition(mut self) -> Result<MethodDefinition> {
        if !self.open_blocks.is_empty() {
            return Err(Error::UnbalancedBlock(format!(
                "method {} ends with {} open block(s)",
                self.token,
                self.open_blocks.len()
            )));
        }

        self.blocks.sort_by_key(|block| block.index);
        let max_index = self.blocks.last().map_or(0, |block| block.index);

        let mut blocks = self.blocks.into_iter().peekable();
        let mut code_blocks = Vec::with_capacity(max_index as usize);
        for index in 1..=max_index {
            match blocks.next_if(|block| block.index == index) {
                Some(block) => code_blocks.push(block),
                None => code_blocks.push(CodeBlock::placeholder(index)),
            }
        }

        Ok(MethodDefinition {
            token: self.token,
            compile_unit: self.compile_unit,
            namespace_id: self.namespace_id,
            locals: self.locals,
            code_blocks,
            scope_variables: self.scope_variables,
            line_numbers: self.sequence_points,
            real_name: self.real_name,
            ambiguous_locals: self.ambiguous_locals,
        })
    }

    /// Finish the method and add it to `store`.
    ///
    /// # Errors
    /// As [`MethodBuilder::into_definition`] and [`SymbolStore::define_method`].
    pub fn define_method(self, store: &mut SymbolStore) -> Result<()> {
        store.define_method(self.into_definition()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MethodBuilder {
        MethodBuilder::new(Token::new(0x0600_0002), 1)
    }

    #[test]
    fn same_offset_keeps_later_position() {
        let mut builder = builder();
        builder.mark_sequence_point(10, 1, 20, 5, false);
        builder.mark_sequence_point(10, 1, 20, 9, false);
        assert_eq!(builder.sequence_points().len(), 1);
        assert_eq!(builder.sequence_points()[0].column, 9);

        builder.mark_sequence_point(10, 1, 21, 1, false);
        assert_eq!(builder.sequence_points()[0].row, 21);
        assert_eq!(builder.sequence_points()[0].column, 1);
    }

    #[test]
    fn same_offset_drops_earlier_position() {
        let mut builder = builder();
        builder.mark_sequence_point(10, 1, 20, 5, false);
        builder.mark_sequence_point(10, 1, 19, 40, false);
        builder.mark_sequence_point(10, 1, 20, 5, true);
        assert_eq!(builder.sequence_points().len(), 1);
        assert_eq!(builder.sequence_points()[0].row, 20);
        assert!(!builder.sequence_points()[0].is_hidden);

        builder.mark_sequence_point(12, 1, 19, 40, false);
        assert_eq!(builder.sequence_points().len(), 2);
    }

    #[test]
    fn nested_blocks() {
        let mut builder = builder();
        let outer = builder.start_block(CodeBlockKind::Lexical, 0).unwrap();
        builder.add_local(0, "a");
        let inner = builder.start_block(CodeBlockKind::IteratorBody, 4).unwrap();
        builder.add_local(1, "b");
        builder.end_block(8).unwrap();
        builder.add_local(2, "c");
        builder.end_block(12).unwrap();
        builder.add_local(3, "d");

        assert_eq!((outer, inner), (1, 2));
        let definition = builder.into_definition().unwrap();
        assert_eq!(
            definition.code_blocks,
            [
                CodeBlock::new(1, -1, CodeBlockKind::Lexical, 0, 12),
                CodeBlock::new(2, 1, CodeBlockKind::IteratorBody, 4, 8),
            ]
        );
        let scopes: Vec<u32> = definition.locals.iter().map(|l| l.block_index).collect();
        assert_eq!(scopes, [1, 2, 1, 0]);
    }

    #[test]
    fn unbalanced_blocks() {
        let mut builder = builder();
        assert!(matches!(builder.end_block(4), Err(Error::UnbalancedBlock(_))));

        builder.start_block(CodeBlockKind::Lexical, 0).unwrap();
        assert!(matches!(
            builder.into_definition(),
            Err(Error::UnbalancedBlock(_))
        ));
    }

    #[test]
    fn gaps_become_placeholders() {
        let mut builder = builder();
        builder
            .add_code_block(CodeBlock::new(3, -1, CodeBlockKind::Lexical, 4, 9))
            .unwrap();
        builder
            .add_code_block(CodeBlock::new(1, -1, CodeBlockKind::Lexical, 0, 2))
            .unwrap();
        assert!(matches!(
            builder.add_code_block(CodeBlock::new(3, -1, CodeBlockKind::Lexical, 0, 0)),
            Err(Error::Duplicate(_))
        ));

        let definition = builder.into_definition().unwrap();
        assert_eq!(definition.code_blocks.len(), 3);
        assert_eq!(definition.code_blocks[1], CodeBlock::placeholder(2));
        assert_eq!(definition.code_blocks[2].start_offset, 4);
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn started_block_after_explicit_ones() {
        let mut builder = builder();
        builder
            .add_code_block(CodeBlock::new(4, -1, CodeBlockKind::Lexical, 0, 2))
            .unwrap();
        assert_eq!(builder.start_block(CodeBlockKind::Lexical, 3).unwrap(), 5);
        assert_eq!(builder.current_block(), 5);
    }

    #[test]
    fn block_indices_past_signed_range() {
        let mut builder = builder();
        builder
            .add_code_block(CodeBlock::new(0x7FFF_FFFF, -1, CodeBlockKind::Lexical, 0, 2))
            .unwrap();
        assert_eq!(
            builder.start_block(CodeBlockKind::Lexical, 3).unwrap(),
            0x8000_0000
        );
        assert!(matches!(
            builder.start_block(CodeBlockKind::Lexical, 4),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(builder.current_block(), 0x8000_0000);

        let mut full = MethodBuilder::new(Token::new(2), 1);
        full.add_code_block(CodeBlock::new(u32::MAX, -1, CodeBlockKind::Lexical, 0, 2))
            .unwrap();
        assert!(matches!(
            full.start_block(CodeBlockKind::Lexical, 3),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
