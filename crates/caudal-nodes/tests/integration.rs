//! Graph-level tests driving the node library through a server.

use caudal_core::{EngineConfig, Param, Server};
use caudal_nodes::{Fader, Noise, Sig, Sine, WgVerb, band_splitter, st_reverb};

#[test]
fn enveloped_oscillator_chain() {
    // Sine amplitude-shaped by a Fader bound as its streaming `mul`.
    let cfg = EngineConfig::new(44100.0, 64, 2);
    let mut srv = Server::new(cfg);
    let env = srv.register(Box::new(Fader::new(&cfg, 0.01, 0.01, 0.1)));
    let osc = srv.register(Box::new(Sine::new(
        &cfg,
        Param::Constant(440.0),
        Param::Constant(0.0),
    )));
    srv.node_mut(osc)
        .unwrap()
        .set_param("mul", Param::Stream(env))
        .unwrap();
    srv.play(env, 0.0, 0.0).unwrap();
    srv.out(osc, 0, 0.0, 0.0).unwrap();

    // During the attack the output is quieter than at sustain.
    let mut peak_early = 0.0f32;
    for _ in 0..3 {
        srv.tick();
        for &x in srv.output_channel(0) {
            peak_early = peak_early.max(x.abs());
        }
    }
    let mut peak_sustain = 0.0f32;
    for _ in 0..20 {
        srv.tick();
        for &x in srv.output_channel(0) {
            peak_sustain = peak_sustain.max(x.abs());
        }
    }
    assert!(peak_early < 0.6);
    assert!(peak_sustain > 0.9);

    // After the fader's dur the chain is silent.
    for _ in 0..100 {
        srv.tick();
    }
    assert!(srv.output_channel(0).iter().all(|&x| x == 0.0));
}

#[test]
fn reverb_on_noise_burst_decays() {
    let cfg = EngineConfig::new(48000.0, 64, 2);
    let mut srv = Server::new(cfg);
    let noise = srv.register(Box::new(Noise::with_seed(7)));
    let rev = srv.register(Box::new(WgVerb::new(
        &cfg,
        noise,
        Param::Constant(0.7),
        Param::Constant(4000.0),
        Param::Constant(1.0),
    )));
    // One tick of noise (duration = one tick), reverb runs on.
    srv.play(noise, cfg.tick_seconds() - 1e-4, 0.0).unwrap();
    srv.play(rev, 0.0, 0.0).unwrap();

    // Wait for the shortest line (~0.03 s) to carry the burst to the taps.
    for _ in 0..40 {
        srv.tick();
    }
    let early: f32 = srv.stream(rev).unwrap().data().iter().map(|x| x * x).sum();
    for _ in 0..2000 {
        srv.tick();
    }
    let late: f32 = srv.stream(rev).unwrap().data().iter().map(|x| x * x).sum();
    assert!(early > 0.0);
    assert!(late < early, "tail should decay: early {early}, late {late}");
}

#[test]
fn stereo_reverb_routes_two_channels() {
    let cfg = EngineConfig::new(48000.0, 64, 2);
    let mut srv = Server::new(cfg);
    let src = srv.register_named("src", Box::new(Sig::new(0.0)));
    let (left, right) = st_reverb(
        &cfg,
        src,
        Param::Constant(0.5),
        Param::Constant(1.0),
        Param::Constant(5000.0),
        Param::Constant(1.0),
        1.0,
    );
    let l = srv.register(Box::new(left));
    let r = srv.register(Box::new(right));
    srv.play(src, 0.0, 0.0).unwrap();
    srv.out(l, 0, 0.0, 0.0).unwrap();
    srv.out(r, 1, 0.0, 0.0).unwrap();

    srv.set_value("src", &[1.0]).unwrap();
    srv.tick();
    srv.set_value("src", &[0.0]).unwrap();
    for _ in 0..40 {
        srv.tick();
    }
    let el: f32 = srv.output_channel(0).iter().map(|x| x * x).sum();
    let er: f32 = srv.output_channel(1).iter().map(|x| x * x).sum();
    assert!(el > 0.0);
    assert!(er > 0.0);
}

#[test]
fn splitter_bands_mix_back_to_output() {
    let cfg = EngineConfig::new(48000.0, 64, 2);
    let mut srv = Server::new(cfg);
    let noise = srv.register(Box::new(Noise::with_seed(11)));
    let taps = band_splitter(
        &cfg,
        noise,
        4,
        Param::Constant(100.0),
        Param::Constant(10000.0),
    );
    for tap in taps {
        let id = srv.register(Box::new(tap));
        srv.out(id, 0, 0.0, 0.0).unwrap();
    }
    srv.play(noise, 0.0, 0.0).unwrap();

    for _ in 0..50 {
        srv.tick();
    }
    let energy: f32 = srv.output_channel(0).iter().map(|x| x * x).sum();
    assert!(energy > 0.0);
    assert!(srv.output_channel(0).iter().all(|x| x.is_finite()));
}

#[test]
fn streaming_frequency_from_envelope() {
    // Linseg sweeping a Sine's frequency: the waveform should be finite
    // and the oscillator must consume the producer's block each tick.
    let cfg = EngineConfig::new(48000.0, 64, 2);
    let mut srv = Server::new(cfg);
    let sweep = srv.register(Box::new(caudal_nodes::Linseg::new(
        &cfg,
        vec![(0.0, 100.0), (0.1, 1000.0)],
        false,
    )));
    let osc = srv.register(Box::new(Sine::new(
        &cfg,
        Param::Stream(sweep),
        Param::Constant(0.0),
    )));
    srv.play(sweep, 0.0, 0.0).unwrap();
    srv.play(osc, 0.0, 0.0).unwrap();
    for _ in 0..100 {
        srv.tick();
        assert!(
            srv.stream(osc)
                .unwrap()
                .data()
                .iter()
                .all(|x| x.is_finite() && x.abs() <= 1.0)
        );
    }
}
