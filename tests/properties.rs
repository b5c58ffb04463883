use std::fs;

use chunkseal::{ChainScope, JoinOptions, SplitOptions};
use proptest::prelude::*;
use tempfile::tempdir;

fn scope_strategy() -> impl Strategy<Value = ChainScope> {
    prop_oneof![Just(ChainScope::WholeFile), Just(ChainScope::PerChunk)]
}

proptest! {
    // 每个 case 都要跑两次 PBKDF2，控制数量
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn join_inverts_split(
        data in proptest::collection::vec(any::<u8>(), 1..2048),
        chunk_size in 8usize..600,
        password in "[ -~]{0,24}",
        scope in scope_strategy(),
    ) {
        let temp = tempdir().unwrap();
        let source = temp.path().join("input.bin");
        let restored = temp.path().join("restored.bin");
        fs::write(&source, &data).unwrap();

        let split = chunkseal::split_file(
            &source,
            chunk_size,
            temp.path(),
            password.as_bytes(),
            &SplitOptions { scope },
            |_| {},
        )
        .unwrap();

        prop_assert_eq!(split.chunk_count, data.len().div_ceil(chunk_size) as u64);

        let joined = chunkseal::join_chunks(
            &split.chunk_dir,
            &restored,
            password.as_bytes(),
            &JoinOptions { scope },
            |_| {},
        )
        .unwrap();

        prop_assert!(joined.padding_valid);
        prop_assert_eq!(joined.total_bytes, data.len() as u64);
        prop_assert_eq!(fs::read(&restored).unwrap(), data);
    }
}
