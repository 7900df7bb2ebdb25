// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Feeds a shuffled `0..n` stream into both sketches and prints the answers
//! for every rank step of `epsilon`.

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use streamquantiles::QuantileSketch;
use streamquantiles::error::Error;
use streamquantiles::gk::GkSketch;
use streamquantiles::sampling::SamplingSketch;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(about = "Sweep quantile queries over a shuffled stream")]
struct Args {
    /// Error bound shared by both sketches.
    #[arg(long, default_value_t = 0.01)]
    epsilon: f64,

    /// Stream length.
    #[arg(long, short, default_value_t = 1000)]
    n: u64,

    /// Seed for the shuffle and the sampling sketch.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Log level: off, trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn feed_all<S: QuantileSketch<u64>>(sketch: &mut S, values: &[u64]) {
    for value in values {
        sketch.feed(*value);
    }
    sketch.finalize();
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let mut values: Vec<u64> = (0..args.n).collect();
    values.shuffle(&mut StdRng::seed_from_u64(args.seed));

    let mut gk = GkSketch::new(args.epsilon)?;
    let mut sampling = SamplingSketch::with_seed(args.epsilon, args.seed)?;
    feed_all(&mut gk, &values);
    feed_all(&mut sampling, &values);

    println!(
        "n = {}, epsilon = {}, gk tuples = {}, sampled items = {}",
        args.n,
        args.epsilon,
        gk.num_retained(),
        sampling.num_retained()
    );
    println!("{:>8} {:>10} {:>10} {:>10}", "rank", "exact", "gk", "sampling");

    let steps = (1.0 / args.epsilon).ceil() as u64;
    let mut worst = (0u64, 0u64);
    for step in 0..=steps {
        let rank = (step as f64 * args.epsilon).min(1.0);
        let exact = ((rank * args.n as f64) as u64).min(args.n.saturating_sub(1));
        let from_gk = gk.query_for_value(rank)?;
        let from_sampling = sampling.query_for_value(rank)?;
        worst.0 = worst.0.max(from_gk.abs_diff(exact));
        worst.1 = worst.1.max(from_sampling.abs_diff(exact));
        println!("{rank:>8.4} {exact:>10} {from_gk:>10} {from_sampling:>10}");
    }

    println!(
        "\nallowed rank error: {:.0}, worst gk: {}, worst sampling: {}",
        args.epsilon * args.n as f64,
        worst.0,
        worst.1
    );
    Ok(())
}
