//! The segment buffer writer.

use crate::error::{CoreError, CoreResult};
use crate::segment::{
    align, BinaryReferenceConsumer, RecordId, RecordType, SegmentHeader, SegmentTracker,
    GC_GENERATION_OFFSET, HEADER_SIZE, MAX_SEGMENT_SIZE, RECORD_ALIGN_BITS, RECORD_ID_BYTES,
    REFERENCED_SEGMENT_ID_COUNT_OFFSET, ROOT_COUNT_OFFSET, SEGMENT_MAGIC, SEGMENT_VERSION,
};
use cairn_store::{SegmentId, SegmentStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Longest accepted writer id.
///
/// The writer id is embedded in the JSON metadata record, which uses the
/// small-value encoding (one length byte), so the whole metadata record
/// must stay below 128 bytes.
const MAX_WRITER_ID_LEN: usize = 64;

/// Configuration for a [`SegmentBufferWriter`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Identity of this logical writer, stamped into every segment's
    /// metadata record.
    pub writer_id: String,
    /// Whether the GC-generation diagnostic runs on every reference
    /// write. Diagnostic only; disabling it never changes behavior.
    pub generation_check: bool,
}

impl WriterConfig {
    /// Creates a configuration with the given writer id and the
    /// generation check enabled.
    pub fn new(writer_id: impl Into<String>) -> Self {
        Self {
            writer_id: writer_id.into(),
            generation_check: true,
        }
    }

    /// Disables the GC-generation diagnostic.
    #[must_use]
    pub fn without_generation_check(mut self) -> Self {
        self.generation_check = false;
        self
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new("w")
    }
}

/// Per-segment write statistics, reset on every segment transition.
#[derive(Debug, Clone)]
pub struct Statistics {
    /// Id of the segment the statistics describe.
    pub id: SegmentId,
    /// Number of distinct referenced segment ids.
    pub segment_id_count: usize,
    /// Number of record ids written.
    pub record_id_count: usize,
    /// Number of records reserved.
    pub record_count: usize,
    /// Final segment size in bytes, set at flush.
    pub size: usize,
}

impl Statistics {
    fn new(id: SegmentId) -> Self {
        Self {
            id,
            segment_id_count: 0,
            record_id_count: 0,
            record_count: 0,
            size: 0,
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={},size={},segmentIdCount={},recordIdCount={},recordCount={}",
            self.id, self.size, self.segment_id_count, self.record_id_count, self.record_count
        )
    }
}

/// The root record table entry: insertion order plus the record's type.
#[derive(Debug, Clone, Copy)]
struct RootEntry {
    order: u32,
    record_type: RecordType,
}

/// The state of the segment currently being written.
///
/// Replaced as a whole on every segment transition, so the buffer, root
/// table, and referenced-id set can never be observed in a torn
/// intermediate state.
struct ActiveSegment {
    id: SegmentId,
    /// The segment write buffer, filled from the end to the beginning.
    buffer: Vec<u8>,
    /// Bytes already written or reserved, counted from the end of the
    /// buffer. Only ever grows.
    length: usize,
    /// Current write position. Grows up as raw data is written, shifted
    /// down by each reservation.
    position: usize,
    /// Records not referenced by any other record in this segment,
    /// stamped with their insertion order.
    roots: HashMap<RecordId, RootEntry>,
    next_root_order: u32,
    /// Distinct segment ids referenced from this segment, stamped with
    /// their insertion order.
    referenced: HashMap<SegmentId, u32>,
    next_reference_order: u32,
    /// Whether any unflushed write has occurred.
    dirty: bool,
}

impl ActiveSegment {
    fn new(id: SegmentId, generation: u32) -> Self {
        let mut buffer = vec![0u8; MAX_SEGMENT_SIZE];
        buffer[0..3].copy_from_slice(&SEGMENT_MAGIC);
        buffer[3] = SEGMENT_VERSION;
        // bytes 4 and 5 stay zero: reserved and reference count placeholder
        buffer[GC_GENERATION_OFFSET..GC_GENERATION_OFFSET + 4]
            .copy_from_slice(&generation.to_be_bytes());

        Self {
            id,
            buffer,
            length: 0,
            position: MAX_SEGMENT_SIZE,
            roots: HashMap::new(),
            next_root_order: 0,
            referenced: HashMap::new(),
            next_reference_order: 0,
            dirty: false,
        }
    }
}

/// Metadata record written as the first record of every segment.
#[derive(Serialize)]
struct SegmentMeta<'a> {
    wid: &'a str,
    sno: u64,
    t: u64,
}

/// Encapsulates the state of a segment being written.
///
/// The writer offers primitive write operations and pre-allocation of
/// buffer space in the current segment. Should the current segment not
/// have enough space left, it is flushed to the store and a fresh one is
/// allocated.
///
/// The common usage pattern is:
///
/// ```ignore
/// let id = writer.prepare(record_type, size, &ids)?; // allocate space
/// writer.write_int(...);                             // fill it
/// ```
///
/// The behavior of this writer is undefined should the pre-allocated
/// space be overrun by the write methods; debug builds assert the cursor
/// stays inside the buffer, release builds do not check.
///
/// Instances are **not thread safe**: exactly one logical writer owns an
/// instance at a time. Higher layers needing concurrent writers must
/// instantiate one writer per identity and serialize access to each.
pub struct SegmentBufferWriter {
    store: Arc<dyn SegmentStore>,
    tracker: Arc<SegmentTracker>,
    binary_reference_consumer: Option<Arc<dyn BinaryReferenceConsumer>>,
    writer_id: String,
    generation: u32,
    generation_check: bool,
    active: ActiveSegment,
    statistics: Statistics,
}

impl SegmentBufferWriter {
    /// Creates a writer bound to one store, one GC generation, and one
    /// writer identity, and allocates its first segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured writer id is longer than 64
    /// bytes; it must fit the segment metadata record.
    pub fn new(
        store: Arc<dyn SegmentStore>,
        tracker: Arc<SegmentTracker>,
        generation: u32,
        config: WriterConfig,
    ) -> CoreResult<Self> {
        if config.writer_id.len() > MAX_WRITER_ID_LEN {
            return Err(CoreError::invalid_operation(format!(
                "writer id longer than {MAX_WRITER_ID_LEN} bytes"
            )));
        }

        let id = store.new_data_segment_id();
        let mut writer = Self {
            store,
            tracker,
            binary_reference_consumer: None,
            writer_id: config.writer_id,
            generation,
            generation_check: config.generation_check,
            active: ActiveSegment::new(id, generation),
            statistics: Statistics::new(id),
        };
        writer.write_segment_meta();
        Ok(writer)
    }

    /// Attaches a consumer notified of every external binary reference
    /// written through this writer.
    #[must_use]
    pub fn with_binary_reference_consumer(
        mut self,
        consumer: Arc<dyn BinaryReferenceConsumer>,
    ) -> Self {
        self.binary_reference_consumer = Some(consumer);
        self
    }

    /// Returns the GC generation stamped into every segment this writer
    /// produces.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the id of the segment currently being written.
    #[must_use]
    pub fn segment_id(&self) -> SegmentId {
        self.active.id
    }

    /// Returns the number of root records in the current segment:
    /// records not (yet) referenced by any other record in it.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.active.roots.len()
    }

    /// Returns the number of distinct other segments referenced from the
    /// current segment.
    #[must_use]
    pub fn referenced_segment_id_count(&self) -> usize {
        self.active.referenced.len()
    }

    /// Returns the statistics of the segment currently being written.
    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Allocates a fresh segment and writes its metadata record.
    ///
    /// The metadata is a JSON object `{"wid":W,"sno":S,"t":T}` where `W`
    /// is the writer id, `S` a unique increasing sequence number for the
    /// allocation order of segments in this store, and `T` a wall-clock
    /// timestamp in milliseconds. It is guaranteed to be the first value
    /// record in every segment, so segments are self-describing.
    fn new_segment(&mut self) {
        let id = self.store.new_data_segment_id();
        // One swap replaces buffer, roots, referenced ids, and cursors as
        // a unit; no torn intermediate state is observable.
        self.active = ActiveSegment::new(id, self.generation);
        self.statistics = Statistics::new(id);
        self.write_segment_meta();
    }

    fn write_segment_meta(&mut self) {
        let meta = SegmentMeta {
            wid: &self.writer_id,
            sno: self.tracker.next_segment_number(),
            t: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        };

        match serde_json::to_vec(&meta) {
            Ok(data) => {
                debug_assert!(data.len() < 128, "metadata record must use the small-value encoding");
                self.reserve(RecordType::Value, 1 + data.len(), 0);
                self.write_byte(data.len() as u8);
                self.write_bytes(&data);
            }
            Err(e) => {
                warn!(segment = %self.active.id, error = %e, "unable to write segment metadata");
            }
        }

        self.active.dirty = false;
    }

    /// Writes a single byte at the current write position.
    pub fn write_byte(&mut self, value: u8) {
        debug_assert!(self.active.position < self.active.buffer.len());
        self.active.buffer[self.active.position] = value;
        self.active.position += 1;
        self.active.dirty = true;
    }

    /// Writes a big-endian 16-bit value at the current write position.
    pub fn write_short(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes a big-endian 32-bit value at the current write position.
    pub fn write_int(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes a big-endian 64-bit value at the current write position.
    pub fn write_long(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes raw bytes at the current write position.
    ///
    /// The caller is responsible for staying within the space reserved by
    /// the preceding [`SegmentBufferWriter::prepare`] call.
    pub fn write_bytes(&mut self, data: &[u8]) {
        let position = self.active.position;
        debug_assert!(position + data.len() <= self.active.buffer.len());
        self.active.buffer[position..position + data.len()].copy_from_slice(data);
        self.active.position += data.len();
        self.active.dirty = true;
    }

    /// Writes a record id and marks it as referenced.
    ///
    /// A referenced record can no longer be a root record of this
    /// segment; if it lives in another segment, that segment is added to
    /// the referenced segment ids.
    pub fn write_record_id(&mut self, record_id: RecordId) {
        self.write_record_id_inner(record_id, true);
    }

    /// Writes a record id without marking it as a reference.
    ///
    /// The target record keeps its root status; used where an id is
    /// embedded as plain data rather than as a record reference.
    pub fn write_record_id_unreferenced(&mut self, record_id: RecordId) {
        self.write_record_id_inner(record_id, false);
    }

    fn write_record_id_inner(&mut self, record_id: RecordId, reference: bool) {
        if reference {
            self.active.roots.remove(&record_id);
        }

        self.check_gc_generation(record_id.segment_id());

        let segment_id = record_id.segment_id();
        self.write_long(segment_id.msb());
        self.write_long(segment_id.lsb());
        self.write_short(((record_id.offset() as usize >> RECORD_ALIGN_BITS) & 0xffff) as u16);

        if segment_id != self.active.id && !self.active.referenced.contains_key(&segment_id) {
            let order = self.active.next_reference_order;
            self.active.referenced.insert(segment_id, order);
            self.active.next_reference_order += 1;
        }

        self.statistics.record_id_count += 1;
        self.active.dirty = true;
    }

    /// Advisory check that a reference does not point backwards across GC
    /// generations or at a missing segment. Logs and returns; never
    /// affects control flow.
    fn check_gc_generation(&self, id: SegmentId) {
        if !self.generation_check || !id.is_data() || id == self.active.id {
            return;
        }

        match self.store.read_segment(id) {
            Ok(data) => match SegmentHeader::parse(&data) {
                Ok(header) if header.generation < self.generation => {
                    warn!(
                        segment = %self.active.id,
                        referenced = %id,
                        referenced_generation = header.generation,
                        writer_generation = self.generation,
                        "detected reference to a segment from a previous gc generation"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(referenced = %id, error = %e, "unable to inspect referenced segment");
                }
            },
            Err(e) if e.is_not_found() => {
                warn!(
                    segment = %self.active.id,
                    referenced = %id,
                    "detected reference to non existing segment"
                );
            }
            Err(e) => {
                warn!(referenced = %id, error = %e, "unable to read referenced segment");
            }
        }
    }

    /// Notifies the attached binary reference consumer, if any, that a
    /// record encoding a reference to an externally stored binary was
    /// written to the current segment.
    pub fn add_binary_reference(&self, binary_reference: &str) {
        if let Some(consumer) = &self.binary_reference_consumer {
            consumer.consume(self.generation, self.active.id, binary_reference);
        }
    }

    /// Reserves space for a record of the given type and size,
    /// referencing `ids`.
    ///
    /// The reservation covers `size` bytes plus the wire size of every id
    /// in `ids`, aligned to the record boundary. If the reservation plus
    /// the projected footer does not fit the current segment (first
    /// estimated optimistically as if every id were a new reference, then
    /// recomputed precisely on overflow) or if the root table would
    /// exceed its 16-bit count field, the current segment is flushed
    /// first and the record is reserved in a fresh one.
    ///
    /// The returned record id is registered as a root of its segment
    /// until some other record references it.
    ///
    /// # Errors
    ///
    /// Propagates store failures from an induced flush. Capacity faults
    /// at flush time surface as [`CoreError::SegmentOverflow`].
    pub fn prepare(
        &mut self,
        record_type: RecordType,
        size: usize,
        ids: &[RecordId],
    ) -> CoreResult<RecordId> {
        let record_size = align(size + ids.len() * RECORD_ID_BYTES, 1 << RECORD_ALIGN_BITS);

        // Optimistic estimate: every id points at a previously
        // unreferenced segment and demotes no local root.
        let mut root_count = self.active.roots.len() + 1;
        let mut referenced_id_count = self.active.referenced.len() + ids.len();
        let mut segment_size = align(
            HEADER_SIZE + root_count * 3 + referenced_id_count * 16 + record_size + self.active.length,
            16,
        );

        if segment_size > self.active.buffer.len() {
            // The estimate overflowed; recompute with exact root and
            // referenced-id counts. The id list can name the same record
            // or segment more than once, so both corrections go through
            // sets.
            let mut foreign_segments = HashSet::new();
            let mut demoted_roots = HashSet::new();

            for id in ids {
                if id.segment_id() != self.active.id {
                    foreign_segments.insert(id.segment_id());
                } else if self.active.roots.contains_key(id) {
                    demoted_roots.insert(*id);
                }
            }

            root_count -= demoted_roots.len();
            referenced_id_count = self.active.referenced.len()
                + foreign_segments
                    .iter()
                    .filter(|segment_id| !self.active.referenced.contains_key(segment_id))
                    .count();

            segment_size = align(
                HEADER_SIZE
                    + root_count * 3
                    + referenced_id_count * 16
                    + record_size
                    + self.active.length,
                16,
            );
        }

        if segment_size > self.active.buffer.len() || root_count > 0xffff {
            self.flush()?;
        }

        Ok(self.reserve(record_type, size, ids.len()))
    }

    /// Carves the reservation out of the free space and registers the new
    /// record as a root. Infallible: callers have already made room.
    fn reserve(&mut self, record_type: RecordType, size: usize, id_count: usize) -> RecordId {
        let record_size = align(size + id_count * RECORD_ID_BYTES, 1 << RECORD_ALIGN_BITS);

        self.active.length += record_size;
        debug_assert!(self.active.length <= self.active.buffer.len());
        self.active.position = self.active.buffer.len() - self.active.length;

        let record_id = RecordId::new(self.active.id, self.active.position as u32);
        let order = self.active.next_root_order;
        self.active.next_root_order += 1;
        self.active.roots.insert(record_id, RootEntry { order, record_type });

        self.statistics.record_count += 1;
        record_id
    }

    /// Completes the current segment and writes it to the store.
    ///
    /// A no-op if nothing was written since the last flush. Otherwise the
    /// root and referenced-segment-id counts are stamped into the header,
    /// the header and tables are relocated to be contiguous with the
    /// payload, the tables are emitted in insertion order, and the final
    /// byte range is handed to the store. A fresh segment is allocated
    /// immediately afterwards.
    ///
    /// This is called automatically when a reservation does not fit; it
    /// can also be called explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SegmentOverflow`] if header, tables, and
    /// payload together exceed the segment capacity, a caller or
    /// configuration error, never retried. Store failures propagate
    /// unmodified; retry policy belongs to the caller.
    pub fn flush(&mut self) -> CoreResult<()> {
        if !self.active.dirty {
            return Ok(());
        }

        let root_count = self.active.roots.len();
        let referenced_id_count = self.active.referenced.len();

        self.active.buffer[ROOT_COUNT_OFFSET..ROOT_COUNT_OFFSET + 2]
            .copy_from_slice(&(root_count as u16).to_be_bytes());
        self.active.buffer
            [REFERENCED_SEGMENT_ID_COUNT_OFFSET..REFERENCED_SEGMENT_ID_COUNT_OFFSET + 4]
            .copy_from_slice(&(referenced_id_count as u32).to_be_bytes());
        self.statistics.segment_id_count = referenced_id_count;

        let total_length = align(
            HEADER_SIZE + referenced_id_count * 16 + root_count * 3 + self.active.length,
            16,
        );
        if total_length > self.active.buffer.len() {
            return Err(CoreError::SegmentOverflow {
                size: total_length,
                capacity: self.active.buffer.len(),
            });
        }

        let mut length = total_length;
        let mut pos = HEADER_SIZE;
        if pos + length <= self.active.buffer.len() {
            // The header and tables fit in front of the payload; shift
            // the header down so the segment occupies one contiguous
            // range at the end of the buffer.
            let start = self.active.buffer.len() - length;
            self.active.buffer.copy_within(0..pos, start);
            pos += start;
        } else {
            // Segments within a header's size of capacity keep the
            // header at the front and accept padding between the tables
            // and the payload.
            length = self.active.buffer.len();
        }

        let mut referenced: Vec<(u32, SegmentId)> = self
            .active
            .referenced
            .iter()
            .map(|(&segment_id, &order)| (order, segment_id))
            .collect();
        referenced.sort_unstable_by_key(|&(order, _)| order);

        for (_, segment_id) in referenced {
            self.active.buffer[pos..pos + 8].copy_from_slice(&segment_id.msb().to_be_bytes());
            self.active.buffer[pos + 8..pos + 16].copy_from_slice(&segment_id.lsb().to_be_bytes());
            pos += 16;
        }

        let mut roots: Vec<(u32, RecordId, RecordType)> = self
            .active
            .roots
            .iter()
            .map(|(&record_id, entry)| (entry.order, record_id, entry.record_type))
            .collect();
        roots.sort_unstable_by_key(|&(order, _, _)| order);

        for (_, record_id, record_type) in roots {
            self.active.buffer[pos] = record_type.as_byte();
            let shifted = ((record_id.offset() as usize) >> RECORD_ALIGN_BITS) as u16;
            self.active.buffer[pos + 1..pos + 3].copy_from_slice(&shifted.to_be_bytes());
            pos += 3;
        }

        self.statistics.size = length;
        debug!(statistics = %self.statistics, "writing data segment");

        let start = self.active.buffer.len() - length;
        self.store
            .write_segment(self.active.id, &self.active.buffer[start..])?;

        self.new_segment();
        Ok(())
    }
}
