use super::assembler::{AssemblerOptions, Generable, StreamingChunkAssembler};
use crate::error::{Result, StreamError};

/// Kind of content block in a streamed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlockType {
    /// Tool call arguments, identified by tool name
    ToolInput { name: String },
    /// Structured output for the response itself
    Structured,
}

/// A single content block with index tracking
#[derive(Debug)]
pub struct ContentBlock<T: Generable> {
    /// Index of this block in the response, as assigned by the provider
    pub index: usize,
    pub block_type: ContentBlockType,
    assembler: StreamingChunkAssembler<T>,
    is_complete: bool,
}

impl<T: Generable> ContentBlock<T> {
    fn new(index: usize, block_type: ContentBlockType, options: AssemblerOptions) -> Self {
        Self {
            index,
            block_type,
            assembler: StreamingChunkAssembler::with_options(options),
            is_complete: false,
        }
    }

    pub fn latest(&self) -> Option<&T::Partial> {
        self.assembler.latest()
    }

    pub fn fragment(&self) -> &str {
        self.assembler.fragment()
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }
}

/// Manages the content blocks of one streamed message.
///
/// Each block accumulates its own fragment; starting a block with an index
/// that is already present replaces it.
#[derive(Debug)]
pub struct ContentBlockManager<T: Generable> {
    blocks: Vec<ContentBlock<T>>,
    options: AssemblerOptions,
}

impl<T: Generable> ContentBlockManager<T> {
    pub fn new() -> Self {
        Self::with_options(AssemblerOptions::default())
    }

    pub fn with_options(options: AssemblerOptions) -> Self {
        Self {
            blocks: Vec::new(),
            options,
        }
    }

    /// Start a tool input block
    pub fn start_tool_input(&mut self, index: usize, name: impl Into<String>) {
        self.start(index, ContentBlockType::ToolInput { name: name.into() });
    }

    /// Start a structured output block
    pub fn start_structured(&mut self, index: usize) {
        self.start(index, ContentBlockType::Structured);
    }

    fn start(&mut self, index: usize, block_type: ContentBlockType) {
        tracing::debug!(index, ?block_type, "Started content block");
        let block = ContentBlock::new(index, block_type, self.options);
        match self.blocks.iter_mut().find(|b| b.index == index) {
            Some(existing) => *existing = block,
            None => self.blocks.push(block),
        }
    }

    /// Append a fragment chunk to a block, returning its latest partial value
    pub fn push(&mut self, index: usize, chunk: &str) -> Result<Option<&T::Partial>> {
        let block = self.get_mut(index)?;
        Ok(block.assembler.push(chunk))
    }

    /// Strictly decode a block's full fragment and mark it complete
    pub fn finish(&mut self, index: usize) -> Result<T> {
        let block = self.get_mut(index)?;
        let value = block.assembler.finish()?;
        block.is_complete = true;
        tracing::debug!(index, size = block.assembler.size(), "Finished content block");
        Ok(value)
    }

    /// Get reference to block by index
    pub fn get(&self, index: usize) -> Option<&ContentBlock<T>> {
        self.blocks.iter().find(|b| b.index == index)
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut ContentBlock<T>> {
        self.blocks
            .iter_mut()
            .find(|b| b.index == index)
            .ok_or(StreamError::UnknownBlock(index))
    }

    /// Get all blocks
    pub fn blocks(&self) -> &[ContentBlock<T>] {
        &self.blocks
    }

    /// Get count of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Check if any tool input blocks exist
    pub fn has_tool_input(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b.block_type, ContentBlockType::ToolInput { .. }))
    }

    /// Reset for new message
    pub fn reset(&mut self) {
        self.blocks.clear();
    }
}

impl<T: Generable> Default for ContentBlockManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
