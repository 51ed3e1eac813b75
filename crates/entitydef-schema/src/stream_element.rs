//! Flat, index-addressed transcoding steps and the walker that drives them
//!
//! Every `DataType` expands a value into a linear run of elements. A
//! composite with N fields yields `0` = begin, odd = enter field
//! `(i - 1) / 2`, even = leave that field, `2N + 1` = end. Sequences do the
//! same per item. Scalars yield a single element. Entering a field or item
//! descends into the child type's own expansion, so the walker keeps one
//! counter per nesting level instead of recursing.

use crate::data_type::DataType;
use crate::sink::DataSink;
use crate::source::DataSource;
use entitydef_core::{BinaryIStream, BinaryOStream};

/// What a stream element does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A single scalar transfer
    Value,
    /// A whole value handed to a custom streaming implementor
    Custom,
    Begin,
    EnterItem(usize),
    LeaveItem(usize),
    EnterField,
    LeaveField,
    End,
}

/// Runtime shape of the value at one nesting level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelState {
    /// Element or field count, once known
    pub size: usize,
    pub is_none: bool,
}

/// One atomic transcoding step.
///
/// The same element drives both directions; the walker decides which of
/// the two transfers to invoke.
pub trait StreamElement<'a> {
    fn kind(&self) -> ElementKind;

    /// The type whose expansion produced this element
    fn data_type(&self) -> &'a dyn DataType;

    fn from_source_to_stream(
        &self,
        source: &mut dyn DataSource,
        stream: &mut BinaryOStream,
        state: &mut LevelState,
    ) -> bool;

    fn from_stream_to_sink(
        &self,
        stream: &mut BinaryIStream<'_>,
        sink: &mut dyn DataSink,
        state: &mut LevelState,
    ) -> bool;

    /// The nested type to descend into after this element
    fn child_type(&self) -> Option<&'a dyn DataType> {
        None
    }

    fn field_name(&self) -> Option<&'a str> {
        None
    }

    fn is_none_able(&self) -> bool {
        false
    }

    /// True for the begin element of a sequence whose count is on the wire
    fn is_variable_sized(&self) -> bool {
        false
    }

    fn is_custom_streamed(&self) -> bool {
        false
    }

    /// Output from here on is collected into a length-prefixed blob
    fn is_substream_start(&self) -> bool {
        false
    }

    fn is_substream_end(&self) -> bool {
        false
    }
}

struct Level<'a> {
    data_type: &'a dyn DataType,
    index: usize,
    state: LevelState,
}

impl<'a> Level<'a> {
    fn new(data_type: &'a dyn DataType) -> Self {
        Self {
            data_type,
            index: 0,
            state: LevelState::default(),
        }
    }
}

/// An element produced by iterating an `ElementWalker`
pub struct WalkedElement<'a> {
    /// Nesting depth, 0 for the root type
    pub depth: usize,
    pub element: Box<dyn StreamElement<'a> + 'a>,
}

/// Walks the flattened element sequence of a type.
///
/// Without a transfer in between, variable-length sequences resolve to
/// zero items, which suits callers that only want the static layout.
pub struct ElementWalker<'a> {
    stack: Vec<Level<'a>>,
    persistent_only: bool,
}

impl<'a> ElementWalker<'a> {
    pub fn new(root: &'a dyn DataType, persistent_only: bool) -> Self {
        Self {
            stack: vec![Level::new(root)],
            persistent_only,
        }
    }

    /// The element at the current position, popping finished levels
    pub fn element(&mut self) -> Option<Box<dyn StreamElement<'a> + 'a>> {
        loop {
            let persistent_only = self.persistent_only;
            let level = self.stack.last_mut()?;
            let data_type = level.data_type;
            if let Some(element) = data_type.stream_element(
                level.index,
                &mut level.state.size,
                &mut level.state.is_none,
                persistent_only,
            ) {
                return Some(element);
            }

            self.stack.pop();
            if let Some(parent) = self.stack.last_mut() {
                parent.index += 1;
            }
        }
    }

    /// Shape of the innermost level
    pub fn state_mut(&mut self) -> Option<&mut LevelState> {
        self.stack.last_mut().map(|level| &mut level.state)
    }

    pub fn level_size(&self) -> usize {
        self.stack.last().map(|level| level.state.size).unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    pub fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    /// Move past `element`, descending into its child type if it has one
    pub fn advance(&mut self, element: &dyn StreamElement<'a>) {
        match element.child_type() {
            Some(child) => self.stack.push(Level::new(child)),
            None => {
                if let Some(level) = self.stack.last_mut() {
                    level.index += 1;
                }
            }
        }
    }
}

impl<'a> Iterator for ElementWalker<'a> {
    type Item = WalkedElement<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.element()?;
        let depth = self.depth();
        self.advance(element.as_ref());
        Some(WalkedElement { depth, element })
    }
}

/// The codec direction a walk runs in
pub(crate) trait Direction {
    fn step(&mut self, element: &dyn StreamElement<'_>, state: &mut LevelState) -> bool;
}

/// Drive every element of `root` through `direction`. Later elements still
/// run after a failure so that framing stays consistent; the result is
/// false if any step failed.
pub(crate) fn walk<D: Direction>(root: &dyn DataType, persistent_only: bool, direction: &mut D) -> bool {
    let mut walker = ElementWalker::new(root, persistent_only);
    let mut result = true;

    while let Some(element) = walker.element() {
        let Some(state) = walker.state_mut() else {
            break;
        };
        result &= direction.step(element.as_ref(), state);
        walker.advance(element.as_ref());
    }

    result
}

/// Source to stream
pub(crate) struct Encoder<'s> {
    source: &'s mut dyn DataSource,
    out: &'s mut BinaryOStream,
    substreams: Vec<BinaryOStream>,
}

impl<'s> Encoder<'s> {
    pub fn new(source: &'s mut dyn DataSource, out: &'s mut BinaryOStream) -> Self {
        Self {
            source,
            out,
            substreams: Vec::new(),
        }
    }

    fn close_substream(&mut self) -> bool {
        let Some(substream) = self.substreams.pop() else {
            log::error!("Encoder: substream end without a matching start");
            return false;
        };
        let stream = match self.substreams.last_mut() {
            Some(parent) => parent,
            None => &mut *self.out,
        };
        stream.write_blob(substream.data())
    }
}

impl Direction for Encoder<'_> {
    fn step(&mut self, element: &dyn StreamElement<'_>, state: &mut LevelState) -> bool {
        if element.is_substream_start() {
            self.substreams.push(BinaryOStream::new());
        }

        let stream = match self.substreams.last_mut() {
            Some(substream) => substream,
            None => &mut *self.out,
        };
        let mut result = element.from_source_to_stream(&mut *self.source, stream, state);

        if element.is_substream_end() {
            result &= self.close_substream();
        }
        result
    }
}

/// Stream to sink
pub(crate) struct Decoder<'s, 'b> {
    input: &'s mut BinaryIStream<'b>,
    sink: &'s mut dyn DataSink,
    substreams: Vec<BinaryIStream<'b>>,
}

impl<'s, 'b> Decoder<'s, 'b> {
    pub fn new(input: &'s mut BinaryIStream<'b>, sink: &'s mut dyn DataSink) -> Self {
        Self {
            input,
            sink,
            substreams: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut BinaryIStream<'b> {
        match self.substreams.last_mut() {
            Some(substream) => substream,
            None => &mut *self.input,
        }
    }

    fn open_substream(&mut self) -> bool {
        match self.current().read_blob() {
            Some(bytes) => {
                self.substreams.push(BinaryIStream::new(bytes));
                true
            }
            None => {
                log::error!("Decoder: not enough data for substream");
                // Later reads must fail rather than fall through to the parent
                let mut failed = BinaryIStream::new(&[]);
                failed.set_error();
                self.substreams.push(failed);
                false
            }
        }
    }

    fn close_substream(&mut self) -> bool {
        match self.substreams.pop() {
            Some(substream) if substream.is_finished() => true,
            Some(substream) => {
                if !substream.error() {
                    log::error!(
                        "Decoder: {} unread bytes left in substream",
                        substream.remaining_length()
                    );
                }
                false
            }
            None => {
                log::error!("Decoder: substream end without a matching start");
                false
            }
        }
    }
}

impl Direction for Decoder<'_, '_> {
    fn step(&mut self, element: &dyn StreamElement<'_>, state: &mut LevelState) -> bool {
        let mut result = true;
        if element.is_substream_start() {
            result &= self.open_substream();
        }

        let stream = match self.substreams.last_mut() {
            Some(substream) => substream,
            None => &mut *self.input,
        };
        result &= element.from_stream_to_sink(stream, &mut *self.sink, state);

        if element.is_substream_end() {
            result &= self.close_substream();
        }
        result
    }
}
