//! Frame decoder
//!
//! The [`Decoder`] drives one [`LineCode`] over one
//! [`SampleCursor`]. It finds each start of communication,
//! decodes symbols into bits, assembles bits into bytes, and
//! reports everything it finds to a [`RecordSink`].

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use crate::assembler::{BitQueue, DataByte};
use crate::cursor::{EndOfInput, SampleCursor};
use crate::framing::{Frame, FrameBuilder, FrameStatus};
use crate::linecode::{LineCode, Loadmod, Miller, Step};
use crate::output::{OutputFormat, Record, RecordKind, RecordSink, Span};

/// Decoder for the reader direction
pub type ReaderDecoder<C> = Decoder<Miller, C>;

/// Decoder for the card direction
pub type CardDecoder<C> = Decoder<Loadmod, C>;

/// ISO 14443-A frame decoder
///
/// Create with the [`DecoderBuilder`](crate::DecoderBuilder)
/// or with [`Decoder::new()`].
///
/// The decoder owns its cursor and decodes until the cursor runs
/// out of input. Use [`run()`](Decoder::run) to decode
/// everything into a sink, or [`iter()`](Decoder::iter) to
/// obtain the frames one at a time.
///
/// Protocol faults do not stop the decoder. A frame which fails
/// is reported with a [`FrameStatus`] other than `Ok`, and
/// decoding resumes with the next start of communication.
#[derive(Clone, Debug)]
pub struct Decoder<L, C>
where
    L: LineCode,
    C: SampleCursor,
{
    line: L,
    cursor: C,
    format: OutputFormat,
    queue: BitQueue,
    frame_count: u64,
}

impl<L, C> Decoder<L, C>
where
    L: LineCode,
    C: SampleCursor,
{
    /// New decoder
    ///
    /// Decodes the `line` code from `cursor`, reporting the
    /// given output `format`.
    pub fn new(line: L, cursor: C, format: OutputFormat) -> Self {
        let queue = BitQueue::new(L::EOC_HOLDBACK, *line.timing());
        Self {
            line,
            cursor,
            format,
            queue,
            frame_count: 0,
        }
    }

    /// Line code
    pub fn line_code(&self) -> &L {
        &self.line
    }

    /// Output format
    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Cursor
    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    /// Consume the decoder, returning its cursor
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Lifetime count of frames reported, including faulty ones
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Move off of an active channel
    ///
    /// If the channel is not at its idle level, advance to the
    /// next transition.
    pub fn wait_for_idle(&mut self) -> Result<(), EndOfInput> {
        if self.cursor.bit_level() != self.line.idle_level() {
            self.cursor.advance_to_next_edge()?;
        }
        Ok(())
    }

    /// Receive one frame
    ///
    /// Waits for the next start of communication and decodes
    /// until the frame ends. Every record is reported to `sink`
    /// as soon as it is known. The last record is always the
    /// [`Frame`] itself, which is also returned.
    ///
    /// An error is returned if the input ends first. A frame
    /// which is in progress at the end of input is not reported.
    pub fn receive_frame<S>(&mut self, sink: &mut S) -> Result<Frame, EndOfInput>
    where
        S: RecordSink + ?Sized,
    {
        self.wait_for_idle()?;
        self.cursor.advance_to_next_edge()?;

        let timing = *self.line.timing();
        let frame_start = self.cursor.sample_number();
        let mut frame = FrameBuilder::new(L::DIRECTION, frame_start);
        self.queue.reset();

        // start of communication
        let soc = self.line.receive_seq(&mut self.cursor, frame_start)?;
        let soc_span = timing.span(frame_start, 1);
        self.emit_sequence(sink, soc, soc_span);
        if soc != L::START_OF_COMMUNICATION {
            debug!(
                "decoder: {}: expected start of communication at {}, got {:?}",
                L::DIRECTION,
                frame_start,
                soc
            );
            frame.fault(FrameStatus::SocError);
            return Ok(self.finish(sink, frame, soc_span.end));
        }
        self.emit_bytes_view(sink, RecordKind::StartOfCommunication(soc_span));

        let mut state = L::initial_state();
        let mut seq_num = 1u32;
        loop {
            let seq_start = timing.seq_start(frame_start, seq_num);
            let seq = self.line.receive_seq(&mut self.cursor, seq_start)?;
            let span = timing.span(seq_start, 1);
            self.emit_sequence(sink, seq, span);

            match L::step(&mut state, seq) {
                Step::Data(bit) => {
                    if let Some(byte) = self.queue.push(bit, seq_start) {
                        self.accept_byte(sink, &mut frame, byte);
                    }
                }
                Step::EndOfCommunication => {
                    let mut eoc_start = seq_start;
                    for _ in 0..L::EOC_HOLDBACK {
                        eoc_start = match self.queue.pop_back() {
                            Some(claimed) => claimed.sample,
                            None => frame_start,
                        };
                    }

                    if let Some(byte) = self.queue.drain_final() {
                        self.accept_byte(sink, &mut frame, byte);
                    }

                    let eoc_span = timing.span(eoc_start, 2);
                    self.emit_bytes_view(sink, RecordKind::EndOfCommunication(eoc_span));
                    return Ok(self.finish(sink, frame, eoc_span.end));
                }
                Step::Invalid => {
                    debug!(
                        "decoder: {}: unexpected {:?} at {} (symbol {})",
                        L::DIRECTION,
                        seq,
                        seq_start,
                        seq_num
                    );
                    self.queue.reset();
                    frame.fault(FrameStatus::SequenceError);
                    return Ok(self.finish(sink, frame, span.end));
                }
            }

            seq_num += 1;
        }
    }

    /// Decode until the end of input
    ///
    /// Every record is reported to `sink`. This method returns
    /// only when the cursor runs out of input.
    pub fn run<S>(&mut self, mut sink: S) -> EndOfInput
    where
        S: RecordSink,
    {
        loop {
            if let Err(eoi) = self.receive_frame(&mut sink) {
                info!(
                    "decoder: {}: {} ({} frames)",
                    L::DIRECTION,
                    eoi,
                    self.frame_count
                );
                return eoi;
            }
        }
    }

    /// Iterate over frames
    ///
    /// Records are reported to `sink` as with
    /// [`run()`](Decoder::run). The iterator ends at the end of
    /// input.
    ///
    /// ```
    /// use nfcaphy::{BitLevel, DecoderBuilder, Record, SyntheticCapture};
    ///
    /// let mut capture = SyntheticCapture::new(13_560_000 * 8, BitLevel::High);
    /// capture.idle_bits(4.0).reader_frame(&[0x26], 7).idle_bits(4.0);
    ///
    /// let mut decoder = DecoderBuilder::new(13_560_000 * 8).build_reader(capture.build());
    /// let mut records: Vec<Record> = vec![];
    /// let frames: Vec<_> = decoder.iter(&mut records).collect();
    ///
    /// assert_eq!(frames.len(), 1);
    /// assert_eq!(frames[0].data, vec![0x26]);
    /// assert_eq!(frames[0].valid_bits_in_last_byte, 7);
    /// ```
    pub fn iter<'dec, S>(&'dec mut self, sink: S) -> Frames<'dec, L, C, S>
    where
        S: RecordSink,
    {
        Frames {
            decoder: self,
            sink,
            done: false,
        }
    }

    // add a byte to the frame and report it
    fn accept_byte<S>(&mut self, sink: &mut S, frame: &mut FrameBuilder, byte: DataByte)
    where
        S: RecordSink + ?Sized,
    {
        frame.push_byte(&byte);
        self.emit_bytes_view(sink, RecordKind::Byte(byte));
    }

    // seal and report the frame
    fn finish<S>(&mut self, sink: &mut S, frame: FrameBuilder, end: u64) -> Frame
    where
        S: RecordSink + ?Sized,
    {
        let frame = frame.seal(end);
        self.frame_count += 1;
        info!(
            "decoder: {}: [{}..{}] {}",
            frame.direction, frame.start, frame.end, frame
        );
        sink.emit(Record::new(L::DIRECTION, RecordKind::Frame(frame.clone())));
        frame
    }

    fn emit_sequence<S>(&self, sink: &mut S, seq: L::Seq, span: Span)
    where
        S: RecordSink + ?Sized,
    {
        if self.format == OutputFormat::Sequences {
            sink.emit(Record::new(
                L::DIRECTION,
                RecordKind::Sequence {
                    seq: seq.into(),
                    span,
                },
            ));
        }
    }

    fn emit_bytes_view<S>(&self, sink: &mut S, kind: RecordKind)
    where
        S: RecordSink + ?Sized,
    {
        if self.format == OutputFormat::Bytes {
            sink.emit(Record::new(L::DIRECTION, kind));
        }
    }
}

/// Iterator over received frames
///
/// See [`Decoder::iter()`].
#[derive(Debug)]
pub struct Frames<'dec, L, C, S>
where
    L: LineCode,
    C: SampleCursor,
    S: RecordSink,
{
    decoder: &'dec mut Decoder<L, C>,
    sink: S,
    done: bool,
}

impl<'dec, L, C, S> Iterator for Frames<'dec, L, C, S>
where
    L: LineCode,
    C: SampleCursor,
    S: RecordSink,
{
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.decoder.receive_frame(&mut self.sink) {
            Ok(frame) => Some(frame),
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

impl<'dec, L, C, S> std::iter::FusedIterator for Frames<'dec, L, C, S>
where
    L: LineCode,
    C: SampleCursor,
    S: RecordSink,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cursor::{BitLevel, EdgeCursor};
    use crate::linecode::{LoadmodSeq, MillerSeq};
    use crate::output::{Direction, Sequence};
    use crate::waveform::{frame_bits, loadmod_sequences, miller_sequences, SyntheticCapture};
    use crate::BitTiming;

    // exactly 1024 samples per bit
    const RATE_EXACT: u32 = 108_480_000;

    // fractional samples per bit
    const RATE_FRACTIONAL: u32 = 50_000_000;

    fn reader(rate: u32, idle: BitLevel, format: OutputFormat, cursor: EdgeCursor) -> ReaderDecoder<EdgeCursor> {
        Decoder::new(Miller::new(BitTiming::new(rate), idle), cursor, format)
    }

    fn card(rate: u32, idle: BitLevel, format: OutputFormat, cursor: EdgeCursor) -> CardDecoder<EdgeCursor> {
        Decoder::new(Loadmod::new(BitTiming::new(rate), idle), cursor, format)
    }

    fn frames(records: &[Record]) -> Vec<Frame> {
        records.iter().filter_map(|r| r.frame()).cloned().collect()
    }

    #[test]
    fn test_reader_frame_bytes_view() {
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(4.0).reader_frame(&[0x4B], 8).idle_bits(4.0);
        let len = capture.position();

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        assert_eq!(decoder.run(&mut records), EndOfInput(len));
        assert_eq!(records.len(), 4);

        assert_eq!(
            records[0].kind(),
            &RecordKind::StartOfCommunication(Span::new(4096, 5119))
        );

        let byte = records[1].byte().expect("byte");
        assert_eq!(byte.value, 0x4B);
        assert_eq!(byte.valid_bits, 8);
        assert!(!byte.parity_error);
        assert_eq!(byte.span, Span::new(5120, 14335));

        assert_eq!(
            records[2].kind(),
            &RecordKind::EndOfCommunication(Span::new(14336, 16383))
        );

        let frame = records[3].frame().expect("frame");
        assert_eq!(frame.direction, Direction::ReaderToCard);
        assert_eq!(frame.status, FrameStatus::Ok);
        assert_eq!(frame.data, vec![0x4B]);
        assert_eq!(frame.valid_bits_in_last_byte, 8);
        assert_eq!(frame.parity_errors, 0);
        assert_eq!((frame.start, frame.end), (4096, 16383));
        assert!(records
            .iter()
            .all(|r| r.direction() == Direction::ReaderToCard));
        assert_eq!(decoder.frame_count(), 1);
    }

    #[test]
    fn test_reader_frame_sequences_view() {
        use MillerSeq::{X, Y, Z};

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::Low);
        capture.idle_bits(4.0).reader_frame(&[0x4B], 8).idle_bits(4.0);

        let mut decoder = reader(RATE_EXACT, BitLevel::Low, OutputFormat::Sequences, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let seqs: Vec<Sequence> = records.iter().filter_map(|r| r.sequence()).collect();
        let expect: Vec<Sequence> = [Z, X, X, Y, X, Y, Z, X, Y, X, Y, Y]
            .iter()
            .map(|&s| s.into())
            .collect();
        assert_eq!(seqs, expect);

        // no bytes in this view, and the frame comes last
        assert_eq!(records.len(), 13);
        assert!(records.iter().all(|r| r.byte().is_none()));
        assert_eq!(records[0].span(), Span::new(4096, 5119));
        assert_eq!(records[11].span(), Span::new(4096 + 11 * 1024, 16383));
        let frame = records[12].frame().expect("frame");
        assert_eq!(frame.data, vec![0x4B]);
        assert!(frame.status.is_ok());
    }

    #[test]
    fn test_card_frame() {
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::Low);
        capture.idle_bits(3.0).card_frame(&[0x04, 0x00], 8).idle_bits(3.0);

        let mut decoder = card(RATE_EXACT, BitLevel::Low, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);
        assert_eq!(records.len(), 5);

        let base = 3 * 1024;
        assert_eq!(
            records[0].kind(),
            &RecordKind::StartOfCommunication(Span::new(base, base + 1023))
        );
        assert_eq!(records[1].byte().map(|b| b.value), Some(0x04));
        assert_eq!(records[2].byte().map(|b| b.value), Some(0x00));
        assert_eq!(
            records[2].span(),
            Span::new(base + 10 * 1024, base + 19 * 1024 - 1)
        );

        // EOC begins at F
        let eoc = base + 19 * 1024;
        assert_eq!(
            records[3].kind(),
            &RecordKind::EndOfCommunication(Span::new(eoc, eoc + 2047))
        );

        let frame = records[4].frame().expect("frame");
        assert_eq!(frame.direction, Direction::CardToReader);
        assert_eq!(frame.data, vec![0x04, 0x00]);
        assert_eq!(frame.status, FrameStatus::Ok);
        assert_eq!((frame.start, frame.end), (base, eoc + 2047));
    }

    #[test]
    fn test_card_sequences_view() {
        use LoadmodSeq::{D, E, F};

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(3.0).card_frame(&[0x01], 3).idle_bits(3.0);

        let mut decoder = card(RATE_EXACT, BitLevel::High, OutputFormat::Sequences, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let seqs: Vec<Sequence> = records.iter().filter_map(|r| r.sequence()).collect();
        let expect: Vec<Sequence> = [D, D, E, E, F].iter().map(|&s| s.into()).collect();
        assert_eq!(seqs, expect);

        let frame = records.last().and_then(|r| r.frame()).expect("frame");
        assert_eq!(frame.data, vec![0x01]);
        assert_eq!(frame.valid_bits_in_last_byte, 3);
    }

    #[test]
    fn test_reader_soc_error() {
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture
            .idle_bits(2.0)
            .miller(&[MillerSeq::Error])
            .idle_bits(4.0)
            .reader_frame(&[0x52], 7)
            .idle_bits(4.0);

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let frames = frames(&records);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].status, FrameStatus::SocError);
        assert!(frames[0].data.is_empty());
        assert_eq!(frames[0].end, frames[0].start + 1023);

        // the decoder recovers for the next frame
        assert_eq!(frames[1].status, FrameStatus::Ok);
        assert_eq!(frames[1].data, vec![0x52]);
        assert_eq!(frames[1].valid_bits_in_last_byte, 7);

        // no SOC is reported for the bad frame
        assert!(records[0].frame().is_some());
    }

    #[test]
    fn test_reader_soc_error_sequences_view() {
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(2.0).miller(&[MillerSeq::Error]).idle_bits(4.0);

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Sequences, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence(), Some(Sequence::Miller(MillerSeq::Error)));
        assert_eq!(
            records[1].frame().map(|f| f.status),
            Some(FrameStatus::SocError)
        );
    }

    #[test]
    fn test_card_soc_error() {
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::Low);
        capture
            .idle_bits(2.0)
            .loadmod(&[LoadmodSeq::Error])
            .idle_bits(4.0)
            .card_frame(&[0x44, 0x00], 8)
            .idle_bits(4.0);

        let mut decoder = card(RATE_EXACT, BitLevel::Low, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let frames = frames(&records);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].status, FrameStatus::SocError);
        assert_eq!(frames[0].start, 2048);
        assert!(frames[0].data.is_empty());
        assert_eq!(frames[1].status, FrameStatus::Ok);
        assert_eq!(frames[1].data, vec![0x44, 0x00]);
    }

    #[test]
    fn test_reader_sequence_error_keeps_bytes() {
        let mut seqs = miller_sequences(&frame_bits(&[0x4B], 8));
        seqs.truncate(seqs.len() - 2);
        seqs.push(MillerSeq::X);
        seqs.push(MillerSeq::Z);

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(2.0).miller(&seqs).idle_bits(4.0);

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let frames = frames(&records);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, FrameStatus::SequenceError);
        assert_eq!(frames[0].data, vec![0x4B]);

        // ends with the offending symbol
        assert_eq!(frames[0].end, 2048 + 12 * 1024 - 1);

        // no EOC
        assert!(!records
            .iter()
            .any(|r| matches!(r.kind(), RecordKind::EndOfCommunication(_))));
    }

    #[test]
    fn test_card_sequence_error_keeps_bytes() {
        let mut seqs = loadmod_sequences(&frame_bits(&[0x44, 0x00], 8));
        seqs.pop();
        seqs.push(LoadmodSeq::Error);
        seqs.push(LoadmodSeq::F);

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::Low);
        capture.idle_bits(2.0).loadmod(&seqs).idle_bits(4.0);

        let mut decoder = card(RATE_EXACT, BitLevel::Low, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let frames = frames(&records);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, FrameStatus::SequenceError);
        assert_eq!(frames[0].data, vec![0x44, 0x00]);
        assert_eq!(frames[0].end, 2048 + 20 * 1024 - 1);
    }

    #[test]
    fn test_parity_error_frame() {
        let mut bits = frame_bits(&[0x93, 0x20], 8);
        bits[8] = !bits[8];

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture
            .idle_bits(2.0)
            .miller(&miller_sequences(&bits))
            .idle_bits(4.0);

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        decoder.run(&mut records);

        let bytes: Vec<&DataByte> = records.iter().filter_map(|r| r.byte()).collect();
        assert_eq!(bytes.len(), 2);
        assert!(bytes[0].parity_error);
        assert!(!bytes[1].parity_error);

        // the whole frame is still received
        let frames = frames(&records);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, FrameStatus::ParityError);
        assert_eq!(frames[0].parity_errors, 1);
        assert_eq!(frames[0].data, vec![0x93, 0x20]);
        assert!(records
            .iter()
            .any(|r| matches!(r.kind(), RecordKind::EndOfCommunication(_))));
    }

    #[test]
    fn test_partial_bytes_both_directions() {
        let data = [0x93, 0x70, 0xA5];
        for rate in [RATE_EXACT, RATE_FRACTIONAL] {
            for last_bits in 1..=8u8 {
                let mut expect = data.to_vec();
                if last_bits < 8 {
                    expect[2] &= (1u8 << last_bits) - 1;
                }

                let mut capture = SyntheticCapture::new(rate, BitLevel::High);
                capture.idle_bits(3.0).reader_frame(&expect, last_bits).idle_bits(3.0);
                let mut decoder = reader(rate, BitLevel::High, OutputFormat::Bytes, capture.build());
                let got: Vec<Frame> = decoder.iter(Vec::<Record>::new()).collect();
                assert_eq!(got.len(), 1, "reader, {} Hz, {} bits", rate, last_bits);
                assert_eq!(got[0].data, expect);
                assert_eq!(got[0].valid_bits_in_last_byte, last_bits);
                assert_eq!(got[0].status, FrameStatus::Ok);

                let mut capture = SyntheticCapture::new(rate, BitLevel::Low);
                capture.idle_bits(3.0).card_frame(&expect, last_bits).idle_bits(3.0);
                let mut decoder = card(rate, BitLevel::Low, OutputFormat::Bytes, capture.build());
                let got: Vec<Frame> = decoder.iter(Vec::<Record>::new()).collect();
                assert_eq!(got.len(), 1, "card, {} Hz, {} bits", rate, last_bits);
                assert_eq!(got[0].data, expect);
                assert_eq!(got[0].valid_bits_in_last_byte, last_bits);
                assert_eq!(got[0].status, FrameStatus::Ok);
            }
        }
    }

    #[test]
    fn test_reader_round_trip_short_strings() {
        // every bit string up to one byte, through the waveform
        for nbits in 1..=8u32 {
            for pattern in 0..(1u32 << nbits) {
                let bits: Vec<bool> = (0..nbits).map(|i| pattern & (1 << i) != 0).collect();
                let mut capture = SyntheticCapture::new(RATE_FRACTIONAL, BitLevel::High);
                capture
                    .idle_bits(2.0)
                    .miller(&miller_sequences(&bits))
                    .idle_bits(2.0);

                let mut decoder = reader(RATE_FRACTIONAL, BitLevel::High, OutputFormat::Bytes, capture.build());
                let mut records: Vec<Record> = vec![];
                decoder.run(&mut records);

                let frames = frames(&records);
                assert_eq!(frames.len(), 1, "pattern {:b}/{}", pattern, nbits);
                assert_eq!(frames[0].status, FrameStatus::Ok);

                assert_eq!(frames[0].data, vec![pattern as u8]);
                assert_eq!(frames[0].valid_bits_in_last_byte, nbits as u8);
            }
        }
    }

    #[test]
    fn test_conversation() {
        // REQA, then ATQA from the card on another channel
        let mut pcd = SyntheticCapture::new(RATE_FRACTIONAL, BitLevel::High);
        pcd.idle_bits(5.0)
            .reader_frame(&[0x26], 7)
            .idle_bits(40.0)
            .reader_frame(&[0x93, 0x20], 8)
            .idle_bits(5.0);

        let mut picc = SyntheticCapture::new(RATE_FRACTIONAL, BitLevel::Low);
        picc.idle_bits(20.0)
            .card_frame(&[0x44, 0x00], 8)
            .idle_bits(40.0);

        let mut records: Vec<Record> = vec![];
        let mut rd = reader(RATE_FRACTIONAL, BitLevel::High, OutputFormat::Bytes, pcd.build());
        let mut cd = card(RATE_FRACTIONAL, BitLevel::Low, OutputFormat::Bytes, picc.build());
        rd.run(&mut records);
        cd.run(&mut records);
        records.sort_by_key(|r| r.span().start);

        let frames = frames(&records);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].data, vec![0x26]);
        assert_eq!(frames[0].direction, Direction::ReaderToCard);
        assert_eq!(frames[1].data, vec![0x44, 0x00]);
        assert_eq!(frames[1].direction, Direction::CardToReader);
        assert_eq!(frames[2].data, vec![0x93, 0x20]);
        assert!(frames.iter().all(|f| f.status.is_ok()));
    }

    #[test]
    fn test_end_of_input_mid_frame() {
        let mut seqs = miller_sequences(&frame_bits(&[0x4B, 0x26], 8));
        seqs.truncate(12);

        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(2.0).miller(&seqs);
        let len = capture.position();

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, capture.build());
        let mut records: Vec<Record> = vec![];
        assert_eq!(decoder.run(&mut records), EndOfInput(len));

        // the first byte was reported, but the frame was not
        assert_eq!(records.iter().filter(|r| r.byte().is_some()).count(), 1);
        assert!(records.iter().all(|r| r.frame().is_none()));
        assert_eq!(decoder.frame_count(), 0);
    }

    #[test]
    fn test_empty_capture() {
        let mut decoder = card(
            RATE_EXACT,
            BitLevel::Low,
            OutputFormat::Bytes,
            EdgeCursor::new(BitLevel::Low, vec![], 0),
        );
        let mut records: Vec<Record> = vec![];
        assert_eq!(decoder.run(&mut records), EndOfInput(0));
        assert!(records.is_empty());
        assert_eq!(decoder.iter(&mut records).next(), None);
    }

    #[test]
    fn test_starts_away_from_idle() {
        // the capture begins in the middle of a pause
        let mut capture = SyntheticCapture::new(RATE_EXACT, BitLevel::High);
        capture.idle_bits(2.0).reader_frame(&[0x26], 7).idle_bits(2.0);
        let built = capture.build();
        let mut edges = vec![100];
        edges.extend_from_slice(built.edges());
        let cursor = EdgeCursor::new(BitLevel::Low, edges, built.len());

        let mut decoder = reader(RATE_EXACT, BitLevel::High, OutputFormat::Bytes, cursor);
        let frames: Vec<Frame> = decoder.iter(Vec::<Record>::new()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, vec![0x26]);
        assert_eq!(frames[0].start, 2048);
    }
}
