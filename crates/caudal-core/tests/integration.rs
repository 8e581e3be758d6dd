//! End-to-end tests for the caudal-core engine: registry order, scheduling,
//! post-processing, routing, and reconfiguration, driven through a real
//! `Server` with minimal test nodes.

use caudal_core::{
    AttrError, EngineConfig, MidiEvent, Node, Param, PlayState, PostFx, Server, StreamId, Tick,
};

/// Emits a fixed value on every sample while active.
struct Hold {
    value: f32,
    post: PostFx,
}

impl Hold {
    fn new(value: f32) -> Self {
        Self {
            value,
            post: PostFx::new(),
        }
    }
}

impl Node for Hold {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        out.fill(self.value);
    }
    fn post(&self) -> &PostFx {
        &self.post
    }
    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }
    fn configure(&mut self, _config: &EngineConfig) {}
    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("value", [v]) => {
                self.value = *v;
                Ok(())
            }
            ("value", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }
}

/// Copies a bound input stream, adding 1.0 to every sample.
struct AddOne {
    input: Param,
    post: PostFx,
}

impl AddOne {
    fn new(input: StreamId) -> Self {
        Self {
            input: Param::Stream(input),
            post: PostFx::new(),
        }
    }

    fn new_unbound() -> Self {
        Self {
            input: Param::Constant(0.0),
            post: PostFx::new(),
        }
    }
}

impl Node for AddOne {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        let src = tick.stream_param(&self.input);
        for (o, &s) in out.iter_mut().zip(src) {
            *o = s + 1.0;
        }
    }
    fn post(&self) -> &PostFx {
        &self.post
    }
    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }
    fn configure(&mut self, _config: &EngineConfig) {}
    fn set_param(&mut self, key: &str, value: Param) -> Result<(), AttrError> {
        match key {
            "input" => {
                self.input = value;
                Ok(())
            }
            _ => Err(AttrError::Unknown),
        }
    }
}

fn server() -> Server {
    Server::new(EngineConfig::new(44100.0, 64, 2))
}

#[test]
fn stopped_stream_stays_silent() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(0.5)));
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.0));
    assert_eq!(srv.stream(id).unwrap().scheduler().state(), PlayState::Stopped);
}

#[test]
fn play_then_out_mixes_into_channel() {
    let mut srv = server();
    let a = srv.register(Box::new(Hold::new(0.25)));
    let b = srv.register(Box::new(Hold::new(0.5)));
    srv.out(a, 0, 0.0, 0.0).unwrap();
    srv.out(b, 0, 0.0, 0.0).unwrap();
    srv.tick();
    // Both routed to channel 0: output accumulates.
    assert!(srv.output_channel(0).iter().all(|&x| (x - 0.75).abs() < 1e-7));
    assert!(srv.output_channel(1).iter().all(|&x| x == 0.0));
}

#[test]
fn producer_before_consumer_is_fresh() {
    let mut srv = server();
    let src = srv.register(Box::new(Hold::new(2.0)));
    let dst = srv.register(Box::new(AddOne::new(src)));
    srv.play(src, 0.0, 0.0).unwrap();
    srv.play(dst, 0.0, 0.0).unwrap();
    srv.tick();
    assert!(srv.stream(dst).unwrap().data().iter().all(|&x| x == 3.0));
}

#[test]
fn consumer_before_producer_reads_stale_block() {
    let mut srv = server();
    // Consumer registered first, producer second: the consumer executes
    // ahead of its producer every tick.
    let dst = srv.register(Box::new(AddOne::new_unbound()));
    let src = srv.register(Box::new(Hold::new(2.0)));
    srv.node_mut(dst)
        .unwrap()
        .set_param("input", Param::Stream(src))
        .unwrap();
    srv.play(src, 0.0, 0.0).unwrap();
    srv.play(dst, 0.0, 0.0).unwrap();
    srv.tick();
    // First tick: consumer ran before the producer, so it saw zeros.
    assert!(srv.stream(dst).unwrap().data().iter().all(|&x| x == 1.0));
    srv.tick();
    // Second tick: consumer sees the producer's previous (now computed) block.
    assert!(srv.stream(dst).unwrap().data().iter().all(|&x| x == 3.0));
}

#[test]
fn unregistered_binding_resolves_to_silence() {
    let mut srv = server();
    let src = srv.register(Box::new(Hold::new(2.0)));
    let dst = srv.register(Box::new(AddOne::new(src)));
    srv.play(src, 0.0, 0.0).unwrap();
    srv.play(dst, 0.0, 0.0).unwrap();
    srv.tick();
    srv.unregister(src);
    srv.tick();
    assert!(srv.stream(dst).unwrap().data().iter().all(|&x| x == 1.0));
}

#[test]
fn postfx_identity_is_bit_exact() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(-0.0)));
    srv.play(id, 0.0, 0.0).unwrap();
    srv.tick();
    // With mul=1, add=0 the negative zero must survive untouched.
    for &x in srv.stream(id).unwrap().data() {
        assert_eq!(x.to_bits(), (-0.0f32).to_bits());
    }
}

#[test]
fn postfx_constant_affine() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(0.5)));
    {
        let node = srv.node_mut(id).unwrap();
        node.post_mut().set_mul(Param::Constant(2.0));
        node.post_mut().set_add(Param::Constant(-0.25));
    }
    srv.play(id, 0.0, 0.0).unwrap();
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| (x - 0.75).abs() < 1e-7));
}

#[test]
fn postfx_streaming_mul() {
    let mut srv = server();
    let gain = srv.register(Box::new(Hold::new(0.5)));
    let sig = srv.register(Box::new(Hold::new(0.8)));
    srv.node_mut(sig)
        .unwrap()
        .set_param("mul", Param::Stream(gain))
        .unwrap();
    srv.play(gain, 0.0, 0.0).unwrap();
    srv.play(sig, 0.0, 0.0).unwrap();
    srv.tick();
    srv.tick();
    assert!(srv.stream(sig).unwrap().data().iter().all(|&x| (x - 0.4).abs() < 1e-7));
}

#[test]
fn postfx_streaming_divide_clamps() {
    let mut srv = server();
    // A divisor stream far below the epsilon threshold.
    let div = srv.register(Box::new(Hold::new(1e-9)));
    let sig = srv.register(Box::new(Hold::new(1.0)));
    srv.node_mut(sig)
        .unwrap()
        .set_param("div", Param::Stream(div))
        .unwrap();
    srv.play(div, 0.0, 0.0).unwrap();
    srv.play(sig, 0.0, 0.0).unwrap();
    srv.tick();
    // Divisor clamps to 1e-5, so 1.0 / 1e-5 = 1e5.
    assert!(srv.stream(sig).unwrap().data().iter().all(|&x| (x - 1e5).abs() < 1.0));
}

#[test]
fn postfx_streaming_sub() {
    let mut srv = server();
    let sub = srv.register(Box::new(Hold::new(0.25)));
    let sig = srv.register(Box::new(Hold::new(1.0)));
    srv.node_mut(sig)
        .unwrap()
        .set_param("sub", Param::Stream(sub))
        .unwrap();
    srv.play(sub, 0.0, 0.0).unwrap();
    srv.play(sig, 0.0, 0.0).unwrap();
    srv.tick();
    assert!(srv.stream(sig).unwrap().data().iter().all(|&x| (x - 0.75).abs() < 1e-7));
}

#[test]
fn delayed_play_produces_exact_silent_ticks() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(1.0)));
    // 0.01 s at 44100/64 rounds to 7 ticks.
    srv.play(id, 0.0, 0.01).unwrap();
    for _ in 0..7 {
        srv.tick();
        assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.0));
    }
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 1.0));
}

#[test]
fn immediate_stop_zeroes_within_tick() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(1.0)));
    srv.out(id, 0, 0.0, 0.0).unwrap();
    srv.tick();
    srv.stop(id, 0.0).unwrap();
    srv.tick();
    let stream = srv.stream(id).unwrap();
    assert!(stream.data().iter().all(|&x| x == 0.0));
    assert_eq!(stream.route(), None);
    assert!(srv.output_channel(0).iter().all(|&x| x == 0.0));
}

#[test]
fn duration_fires_single_end_pulse() {
    let cfg = EngineConfig::new(44100.0, 64, 2);
    let mut srv = Server::new(cfg);
    let id = srv.register(Box::new(Hold::new(1.0)));
    let three_ticks = 3.0 * cfg.tick_seconds() - 1e-4;
    srv.play(id, three_ticks, 0.0).unwrap();
    for _ in 0..3 {
        srv.tick();
        assert!(!srv.stream(id).unwrap().trigger().any());
    }
    srv.tick();
    let stream = srv.stream(id).unwrap();
    assert!(stream.trigger().data()[0] == 1.0);
    assert!(stream.data().iter().all(|&x| x == 0.0));
    srv.tick();
    assert!(!srv.stream(id).unwrap().trigger().any());
}

#[test]
fn named_attributes_and_values() {
    let mut srv = server();
    srv.register_named("carrier", Box::new(Hold::new(0.0)));
    srv.set_value("carrier", &[0.7]).unwrap();
    let id = srv.lookup("carrier").unwrap();
    srv.play(id, 0.0, 0.0).unwrap();
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.7));

    assert!(srv.set_value("missing", &[1.0]).is_err());
    assert!(srv.set_attribute("carrier", "bogus", &[1.0]).is_err());
}

#[test]
fn midi_events_last_one_tick() {
    struct MidiProbe {
        seen: usize,
        post: PostFx,
    }
    impl Node for MidiProbe {
        fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
            self.seen = tick.midi().len();
            out.fill(self.seen as f32);
        }
        fn post(&self) -> &PostFx {
            &self.post
        }
        fn post_mut(&mut self) -> &mut PostFx {
            &mut self.post
        }
        fn configure(&mut self, _config: &EngineConfig) {}
    }

    let mut srv = server();
    let id = srv.register(Box::new(MidiProbe {
        seen: 0,
        post: PostFx::new(),
    }));
    srv.play(id, 0.0, 0.0).unwrap();
    srv.push_midi(MidiEvent {
        status: 0x90,
        data1: 60,
        data2: 100,
    });
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 1.0));
    srv.tick();
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.0));
}

#[test]
fn reconfigure_resizes_all_buffers() {
    let mut srv = server();
    let id = srv.register(Box::new(Hold::new(1.0)));
    srv.play(id, 0.0, 0.0).unwrap();
    srv.tick();
    srv.configure(48000.0, 128);
    assert_eq!(srv.config().buffer_size, 128);
    assert_eq!(srv.stream(id).unwrap().data().len(), 128);
    srv.tick();
    assert_eq!(srv.stream(id).unwrap().data().len(), 128);
    assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 1.0));
    assert_eq!(srv.output_channel(1).len(), 128);
}

#[test]
fn servers_are_isolated() {
    let mut a = server();
    let mut b = server();
    let ia = a.register(Box::new(Hold::new(1.0)));
    let ib = b.register(Box::new(Hold::new(2.0)));
    a.play(ia, 0.0, 0.0).unwrap();
    b.play(ib, 0.0, 0.0).unwrap();
    a.tick();
    assert_eq!(b.ticks(), 0);
    b.tick();
    assert!(a.stream(ia).unwrap().data().iter().all(|&x| x == 1.0));
    assert!(b.stream(ib).unwrap().data().iter().all(|&x| x == 2.0));
}
