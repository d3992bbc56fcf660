//! End-to-end: producer thread → stream buffer → feeder → segmented hypothesis.

use std::sync::Arc;
use std::thread;
use voxstream::config::Config;
use voxstream::engine::metadata_from_text;
use voxstream::transcript::{CandidateTranscript, Token};
use voxstream::{Feeder, Metadata, MockRecognizer, VoxstreamError, open_recognizer};

fn two_candidates() -> Metadata {
    let mut metadata = metadata_from_text("the cat sat", -3.5, 20);
    metadata.transcripts.push(CandidateTranscript {
        tokens: vec![
            Token::new("a", 0, 0.0),
            Token::new(" ", 4, 0.08),
            Token::new("b", 6, 0.12),
        ],
        confidence: -7.0,
    });
    metadata
}

#[test]
fn producer_to_hypothesis() {
    let config = Config::default();
    config.validate().unwrap();
    let pool = config.pool.build();
    let buffer = Arc::new(config.stream_buffer(&pool).unwrap());
    let recognizer = open_recognizer(&config.engine, |path| {
        Ok(MockRecognizer::new(&path.display().to_string()).with_response(two_candidates()))
    })
    .unwrap();
    assert_eq!(recognizer.beam_width(), config.engine.beam_width);

    let handle = Feeder::for_recognizer(buffer.clone(), &recognizer, config.engine.num_results)
        .unwrap()
        .spawn()
        .unwrap();

    let producer = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            for i in 0..250 {
                let mut frame = buffer.alloc();
                frame.fill(i as i16);
                buffer.write_blocking(frame).unwrap();
            }
            buffer.write_final().unwrap();
        })
    };
    producer.join().unwrap();

    let hypothesis = handle.join().unwrap();
    assert_eq!(hypothesis.candidates.len(), 2);

    let best = hypothesis.best().unwrap();
    let words: Vec<_> = best.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(words, vec!["the", "cat", "sat"]);
    assert_eq!(best.confidence, -3.5);

    let second = &hypothesis.candidates[1];
    let words: Vec<_> = second.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(words, vec!["a", "b"]);

    let fed = recognizer.fed_samples();
    assert_eq!(fed.len(), 250 * 320);
    assert!(fed[..320].iter().all(|&s| s == 0));
    assert!(fed[249 * 320..].iter().all(|&s| s == 249));
}

#[test]
fn closing_the_buffer_aborts_the_feeder() {
    let config = Config::default();
    let pool = config.pool.build();
    let buffer = Arc::new(config.stream_buffer(&pool).unwrap());
    let recognizer = MockRecognizer::new("mock-en");

    let handle = Feeder::for_recognizer(buffer.clone(), &recognizer, 1)
        .unwrap()
        .spawn()
        .unwrap();

    buffer.write(buffer.alloc()).unwrap();
    buffer.close().unwrap();

    assert!(matches!(handle.join(), Err(VoxstreamError::ClosedPipe)));
}

#[test]
fn hypothesis_serializes_to_json() {
    let pool = voxstream::FramePool::new();
    let buffer = Arc::new(voxstream::StreamBuffer::new(&pool, 16000, 20, 2).unwrap());
    buffer.write(buffer.alloc()).unwrap();
    buffer.write_final().unwrap();

    let recognizer = MockRecognizer::new("mock-en").with_text("hi");
    let hypothesis = Feeder::for_recognizer(buffer, &recognizer, 1)
        .unwrap()
        .run()
        .unwrap();

    let json = hypothesis.to_json().unwrap();
    assert!(json.contains("\"text\":\"hi\""));
}
