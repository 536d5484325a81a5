mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use siren::pump::{FillStatus, FinishReason, OutputPump, PumpState};

use common::{RampDecoder, ScriptedSource, packets, ramp, stereo_frames};

const FRAME: usize = 4; // stereo s16

type TestPump = OutputPump<ScriptedSource, RampDecoder>;

fn pump(source: ScriptedSource, decoder: RampDecoder, buffer_frames: u32) -> TestPump {
    let params = decoder.params(buffer_frames);
    OutputPump::new(source, decoder, params, 0)
}

/// Pull `requested` frames, returning the status and the frames actually delivered.
fn pull(pump: &mut TestPump, requested: usize) -> (FillStatus, Vec<(i16, i16)>) {
    let before = pump.stats().frames_delivered;
    let mut out = vec![0xEEu8; requested * FRAME];
    let status = pump.fill(&mut out, requested);
    let delivered = (pump.stats().frames_delivered - before) as usize;
    (status, stereo_frames(&out[..delivered * FRAME]))
}

/// Pull fixed-size chunks until the pump completes.
fn play_out(pump: &mut TestPump, chunk: usize) -> Vec<(i16, i16)> {
    let mut all = Vec::new();
    loop {
        let (status, frames) = pull(pump, chunk);
        all.extend(frames);
        if status == FillStatus::Complete {
            return all;
        }
    }
}

#[test]
fn three_planar_frames_in_128_frame_callbacks() {
    let mut pump = pump(ScriptedSource::new(packets(0, 3)), RampDecoder::new(100), 128);

    let (status, first) = pull(&mut pump, 128);
    assert_eq!(status, FillStatus::Continue);
    assert_eq!(first.len(), 128);
    assert_eq!(pump.queued_frames(), 72);

    let (status, second) = pull(&mut pump, 128);
    assert_eq!(status, FillStatus::Continue);
    assert_eq!(second.len(), 128);
    assert_eq!(pump.queued_frames(), 44);

    let mut out = vec![0xEEu8; 128 * FRAME];
    assert_eq!(pump.fill(&mut out, 128), FillStatus::Complete);
    let last = stereo_frames(&out[..44 * FRAME]);
    assert!(out[44 * FRAME..].iter().all(|&b| b == 0), "tail is silence");

    let all: Vec<_> = first.into_iter().chain(second).chain(last).collect();
    assert_eq!(all, ramp(300));
    assert_eq!(pump.stats().frames_delivered, 300);
    assert_eq!(pump.state(), PumpState::Stopped);
    assert_eq!(pump.finish_reason(), Some(&FinishReason::EndOfStream));
}

#[test]
fn interleaved_output_matches_planar_output() {
    let mut decoder = RampDecoder::new(100);
    decoder.interleaved = true;
    let mut pump = pump(ScriptedSource::new(packets(0, 3)), decoder, 128);

    assert!(!pump.params().is_planar());
    assert_eq!(play_out(&mut pump, 128), ramp(300));
}

#[test]
fn continue_always_delivers_the_full_request() {
    for seed in 0..16u64 {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut decoder = RampDecoder::new(37);
        decoder.frames_per_receive = 10;
        let mut pump = pump(ScriptedSource::new(packets(0, 20)), decoder, 256);

        let mut all = Vec::new();
        loop {
            let requested = rng.gen_range(0..=300usize);
            let (status, frames) = pull(&mut pump, requested);
            let delivered = frames.len();
            all.extend(frames);

            match status {
                FillStatus::Continue => assert_eq!(delivered, requested),
                FillStatus::Complete => {
                    assert!(delivered <= requested);
                    break;
                }
            }
        }

        assert_eq!(all, ramp(20 * 37));
    }
}

#[test]
fn zero_length_requests_leave_the_queue_alone() {
    let mut pump = pump(ScriptedSource::new(packets(0, 4)), RampDecoder::new(100), 64);

    let (status, _) = pull(&mut pump, 10);
    assert_eq!(status, FillStatus::Continue);
    let queued = pump.queued_frames();
    let reads = pump.source().reads;

    for _ in 0..5 {
        assert_eq!(pump.fill(&mut [0u8; 0], 0), FillStatus::Continue);
    }

    assert_eq!(pump.queued_frames(), queued);
    assert_eq!(pump.source().reads, reads);
    assert_eq!(pump.state(), PumpState::Streaming);
}

#[test]
fn corrupt_packet_is_skipped_without_a_gap() {
    let mut decoder = RampDecoder::new(100);
    decoder.frames_per_receive = 40;
    decoder.corrupt = vec![2];
    let mut pump = pump(ScriptedSource::new(packets(0, 5)), decoder, 128);

    let all = play_out(&mut pump, 128);

    // Four good packets, played back to back.
    assert_eq!(all, ramp(400));
    assert_eq!(pump.finish_reason(), Some(&FinishReason::EndOfStream));
    assert_eq!(pump.stats().packets_skipped, 1);
    assert_eq!(pump.stats().packets_decoded, 4);
}

#[test]
fn foreign_stream_packets_are_never_decoded() {
    let audio = packets(0, 3);
    let other: Vec<_> = packets(7, 3)
        .into_iter()
        .map(|mut p| {
            p.pts += 100;
            p
        })
        .collect();
    let mixed: Vec<_> = audio
        .into_iter()
        .zip(other)
        .flat_map(|(a, o)| [o, a])
        .collect();

    let mut pump = pump(ScriptedSource::new(mixed), RampDecoder::new(100), 128);
    let all = play_out(&mut pump, 128);

    assert_eq!(all, ramp(300));
    assert_eq!(pump.decoder().submitted, vec![0, 1, 2]);
    assert_eq!(pump.stats().packets_discarded, 3);
}

#[test]
fn rejected_packet_completes_playback() {
    let mut decoder = RampDecoder::new(100);
    decoder.reject = vec![1];
    let mut pump = pump(ScriptedSource::new(packets(0, 4)), decoder, 128);

    let mut out = vec![0xEEu8; 128 * FRAME];
    assert_eq!(pump.fill(&mut out, 128), FillStatus::Complete);
    assert!(matches!(
        pump.finish_reason(),
        Some(FinishReason::DecoderFailed(_))
    ));
    assert_eq!(pump.state(), PumpState::Stopped);

    // Later packets are never touched.
    assert_eq!(pump.decoder().submitted, vec![0, 1]);
    assert_eq!(pump.fill(&mut out, 128), FillStatus::Complete);
    assert_eq!(pump.decoder().submitted, vec![0, 1]);
}

#[test]
fn source_failure_completes_playback() {
    let source = ScriptedSource::new(packets(0, 1)).failing_at_end();
    let mut pump = pump(source, RampDecoder::new(100), 128);

    let (status, frames) = pull(&mut pump, 128);
    assert_eq!(status, FillStatus::Complete);
    assert_eq!(frames.len(), 100);
    assert!(matches!(
        pump.finish_reason(),
        Some(FinishReason::SourceFailed(_))
    ));
}

#[test]
fn queue_only_holds_whole_frames_after_padding() {
    let mut decoder = RampDecoder::new(33);
    decoder.interleaved = true;
    let mut pump = pump(ScriptedSource::new(packets(0, 2)), decoder, 16);

    let (status, frames) = pull(&mut pump, 16);
    assert_eq!(status, FillStatus::Continue);
    assert_eq!(frames, ramp(16));
    // 33 frames decoded, 16 delivered; the padding never became a frame.
    assert_eq!(pump.queued_frames(), 17);
}
