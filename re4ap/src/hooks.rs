use std::{
    mem::transmute,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
};

use anyhow::Result;
use re4ap_lib::signatures::SignatureSet;
use tracing::{debug, info, warn};

use crate::{game_link::GameLink, re4::Re4};

const FRAME_TICK: &str = "frame_tick";
const GIVE_ITEM: &str = "give_item";
const LOCATION_PICKUP: &str = "location_pickup";

const ITEMS_PER_FRAME: usize = 1;

type FnFrameTick = extern "C" fn();
type FnGiveItem = extern "C" fn(item_id: u32, count: u32) -> u32;
type FnLocationPickup = extern "C" fn(flag_id: u32) -> u32;

struct Props {
    link: Arc<GameLink>,
    old_frame_tick: AtomicUsize,
    give_item: AtomicUsize,
    old_location_pickup: AtomicUsize,
}

static PROPS: OnceLock<Props> = OnceLock::new();

fn loaded(slot: &AtomicUsize) -> Option<usize> {
    Some(slot.load(Ordering::Acquire)).filter(|&addr| addr != 0)
}

extern "C" fn on_frame_tick() {
    let Some(props) = PROPS.get() else {
        return;
    };
    if let Some(addr) = loaded(&props.old_frame_tick) {
        let old: FnFrameTick = unsafe { transmute(addr) };
        old();
    }
    let Some(addr) = loaded(&props.give_item) else {
        return;
    };
    let give_item: FnGiveItem = unsafe { transmute(addr) };
    for item in props.link.drain_items(ITEMS_PER_FRAME) {
        match u32::try_from(item) {
            Ok(item_id) => {
                let ret = give_item(item_id, 1);
                debug!("give_item({}) = {}", item_id, ret);
            }
            Err(_) => warn!("item id out of range: {}", item),
        }
    }
}

extern "C" fn on_location_pickup(flag_id: u32) -> u32 {
    let Some(props) = PROPS.get() else {
        return 0;
    };
    let ret = match loaded(&props.old_location_pickup) {
        Some(addr) => {
            let old: FnLocationPickup = unsafe { transmute(addr) };
            old(flag_id)
        }
        None => 0,
    };
    props.link.push_location(flag_id as i64);
    ret
}

fn hook_call_site(
    re4: &mut Re4,
    signatures: &SignatureSet,
    name: &str,
    old: &AtomicUsize,
    target: usize,
) -> bool {
    let Some(signature) = signatures.hook(name) else {
        warn!("{}: no signature, hook disabled", name);
        return false;
    };
    let result: Result<()> = (|| {
        let addr = re4.call_site_addr(signature)?;
        old.store(re4.current_callee(addr), Ordering::Release);
        re4.hook_call(addr, target)?;
        Ok(())
    })();
    match result {
        Ok(()) => {
            info!("hooked {}", name);
            true
        }
        Err(err) => {
            old.store(0, Ordering::Release);
            warn!("{}: hook disabled: {}", name, err);
            false
        }
    }
}

/// Installs every hook that has a signature. Missing ones only disable their feature.
pub fn install(re4: &mut Re4, signatures: &SignatureSet, link: Arc<GameLink>) {
    let props = PROPS.get_or_init(|| Props {
        link,
        old_frame_tick: AtomicUsize::new(0),
        give_item: AtomicUsize::new(0),
        old_location_pickup: AtomicUsize::new(0),
    });

    match signatures.hook(GIVE_ITEM).map(|signature| re4.function_addr(signature)) {
        Some(Ok(addr)) => props.give_item.store(addr, Ordering::Release),
        Some(Err(err)) => warn!("{}: {}", GIVE_ITEM, err),
        None => warn!("{}: no signature, received items stay queued", GIVE_ITEM),
    }
    hook_call_site(
        re4,
        signatures,
        FRAME_TICK,
        &props.old_frame_tick,
        on_frame_tick as usize,
    );
    hook_call_site(
        re4,
        signatures,
        LOCATION_PICKUP,
        &props.old_location_pickup,
        on_location_pickup as usize,
    );
}
