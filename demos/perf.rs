use clap::Parser;
use h3gct::{
    hash::BufferedRandomGenerator, FillMode, H3TcGctOkvs, HashKeys, OkvsDecoder, OkvsParams,
};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
struct Arguments {
    /// Number of keys
    #[arg(short, long, default_value_t = 1048576)]
    n: usize,
    /// Value length in bits
    #[arg(short, long, default_value_t = 128)]
    l: usize,
    #[arg(short, long, default_value_t = 1)]
    trials: usize,
    /// Fill untouched slots with zeros instead of randomness
    #[arg(short, long)]
    zero_fill: bool,
}

fn random_map(rng: &mut BufferedRandomGenerator, n: usize, byte_l: usize) -> Vec<([u8; 16], Vec<u8>)> {
    (0..n)
        .map(|_| {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            (key, rng.gen_bytes(byte_l))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args = Arguments::parse();
    let fill_mode = if args.zero_fill { FillMode::Zero } else { FillMode::Random };
    let params = OkvsParams::new(args.n, args.l)?.with_fill_mode(fill_mode);

    println!("[Arguments]");
    println!("  Set size (n)   = {}", args.n);
    println!("    log n        = {:.1}", (args.n as f64).log2());
    println!("  Value bits (l) = {}", args.l);
    println!("  lm = {}, rm = {}, m = {}", params.lm(), params.rm(), params.m());

    let mut rng = BufferedRandomGenerator::from_entropy();
    let mut encode_total = Duration::ZERO;
    let mut decode_total = Duration::ZERO;
    let mut failures = 0;
    for trial in 0..args.trials {
        // random 16-byte keys; a collision would be reported as a duplicate
        let map = random_map(&mut rng, args.n, params.byte_l());
        let okvs = H3TcGctOkvs::new(params.clone(), &HashKeys::from_entropy());

        let start = Instant::now();
        let storage = match okvs.encode_with_rng(&map, &mut rng) {
            Ok(storage) => storage,
            Err(e) if e.is_capacity() => {
                println!("  trial {}: {}, retry with fresh keys", trial, e);
                failures += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        encode_total += start.elapsed();

        let keys: Vec<[u8; 16]> = map.iter().map(|(k, _)| *k).collect();
        let start = Instant::now();
        let decoded = okvs.decode_many(&storage, &keys)?;
        decode_total += start.elapsed();
        assert!(map.iter().zip(&decoded).all(|((_, v), d)| v == d), "decoded values differ");
    }

    let successes = (args.trials - failures).max(1) as u32;
    println!("Encode time: {:?}", encode_total / successes);
    println!("Decode time: {:?}", decode_total / successes);
    println!("Failures: {}/{}", failures, args.trials);
    println!("Encoded length: {} bytes", params.m() * params.byte_l());
    Ok(())
}
