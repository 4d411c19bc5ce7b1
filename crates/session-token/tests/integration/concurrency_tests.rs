//! Concurrent use of one manager across threads, including rotation while
//! verification is in flight.

use session_token::{
    KeyProvider, KeyRing, RotatingKeyProvider, TokenConfig, TokenLifecycleManager,
};
use session_token_test_utils::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const READERS: usize = 8;
const ROTATIONS: u8 = 50;

#[test]
fn test_verify_during_rotation_never_fails() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    // Every rotated-out key stays acceptable, so a failure can only come from
    // observing a partially rotated ring.
    let provider = Arc::new(RotatingKeyProvider::with_max_retired(
        KeyRing::new(test_hmac_key("k0", 0)?),
        usize::from(ROTATIONS),
    ));
    let manager = Arc::new(TokenLifecycleManager::new(
        TokenConfig::new(TEST_ISSUER),
        provider.clone(),
        clock,
    )?);

    let done = AtomicBool::new(false);

    thread::scope(|scope| -> Result<(), anyhow::Error> {
        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let done = &done;
                scope.spawn(move || -> Result<usize, anyhow::Error> {
                    let mut verified = 0;
                    loop {
                        let token = manager.issue(test_principal())?;
                        manager.verify(&token)?;
                        verified += 1;
                        if done.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Ok(verified)
                })
            })
            .collect();

        let rotated = (1..=ROTATIONS).try_for_each(|i| -> Result<(), anyhow::Error> {
            provider.rotate(test_hmac_key(&format!("k{i}"), i)?)?;
            thread::yield_now();
            Ok(())
        });
        done.store(true, Ordering::SeqCst);
        rotated?;

        for reader in readers {
            let verified = reader
                .join()
                .map_err(|_| anyhow::anyhow!("reader thread panicked"))??;
            assert!(verified > 0);
        }
        Ok(())
    })?;

    assert_eq!(provider.current_key()?.kid(), "k50");
    assert_eq!(provider.snapshot().len(), usize::from(ROTATIONS) + 1);
    Ok(())
}

#[test]
fn test_shared_manager_across_threads() -> Result<(), anyhow::Error> {
    let clock = ManualClock::at_test_epoch();
    let manager = Arc::new(test_manager(test_hmac_key("k1", 1)?, clock)?);

    let handles: Vec<_> = (0..READERS)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || -> Result<(), anyhow::Error> {
                let principal =
                    session_token::Principal::new(format!("user-{i}"), format!("name-{i}"));
                let token = manager.issue(principal.clone())?;
                assert_eq!(manager.verify(&token)?.principal(), principal);
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
    }
    Ok(())
}
