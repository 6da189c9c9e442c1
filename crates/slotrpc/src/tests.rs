use crate::*;

// ============================================================================
//  REQUESTS
// ============================================================================

#[test]
fn test_call_header_and_args() -> Result<()> {
    let msg = encode_call("memory.write", &(0x6640_0000u32, vec![1u32, 2]))?;
    assert_eq!(msg.method(), "memory.write");
    assert_eq!(msg.get_word("0")?, 0x6640_0000);
    assert_eq!(msg.get_word_array("1")?, &[1, 2]);
    assert_eq!(msg.get_string(ABI_KEY)?, ABI_VERSION);

    let (addr, data): (u32, Vec<u32>) = decode_args(&msg)?;
    assert_eq!(addr, 0x6640_0000);
    assert_eq!(data, vec![1, 2]);
    Ok(())
}

#[test]
fn test_unit_args_leave_only_the_abi_key() -> Result<()> {
    let msg = encode_call("utils.update_lmdb", &())?;
    assert_eq!(msg.len(), 1);
    assert!(msg.contains(ABI_KEY));
    Ok(())
}

#[test]
fn test_abi_check() -> Result<()> {
    let msg = encode_call("a.b", &())?;
    assert_eq!(check_abi(&msg), Ok(()));

    assert_eq!(check_abi(&WireMessage::new("a.b")), Ok(()));

    let mut other = WireMessage::new("a.b");
    other.set_string(ABI_KEY, "v0");
    let failure = check_abi(&other).err().map(|f| f.kind);
    assert_eq!(failure, Some(FailureKind::Protocol));

    let mut garbled = WireMessage::new("a.b");
    garbled.set_word(ABI_KEY, 1);
    assert!(check_abi(&garbled).is_err());
    Ok(())
}

// ============================================================================
//  REPLIES
// ============================================================================

#[test]
fn test_successful_reply() -> Result<()> {
    let mut reply = WireMessage::new("memory.read");
    encode_result(&mut reply, &vec![7u32, 8, 9])?;
    assert_eq!(failure_of(&reply), None);
    assert_eq!(decode_reply::<Vec<u32>>(&reply)?, vec![7, 8, 9]);
    Ok(())
}

#[test]
fn test_failure_discards_partial_result() -> Result<()> {
    let mut reply = WireMessage::new("memory.read");
    encode_result(&mut reply, &(1u32, 2u32))?;
    encode_failure(&mut reply, &RemoteFailure::new(FailureKind::Handler, "bus error"));

    assert_eq!(reply.method(), "memory.read");
    assert!(!reply.contains("0"));
    assert_eq!(reply.get_string(ERROR_KEY)?, "bus error");
    assert_eq!(reply.get_string(TYPE_KEY)?, "Handler");

    match decode_reply::<(u32, u32)>(&reply) {
        Err(Error::Remote(failure)) => {
            assert_eq!(failure.kind, FailureKind::Handler);
            assert_eq!(failure.message, "bus error");
        }
        other => panic!("expected a remote failure, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_failure_kinds_survive_the_reply() {
    for kind in [FailureKind::UnknownMethod, FailureKind::ModuleLoad, FailureKind::Handler, FailureKind::Protocol] {
        let mut reply = WireMessage::new("x.y");
        encode_failure(&mut reply, &RemoteFailure::new(kind, "boom"));
        assert_eq!(failure_of(&reply).map(|f| f.kind), Some(kind));
    }
}

#[test]
fn test_untyped_error_reads_as_handler() {
    let mut reply = WireMessage::new("x.y");
    reply.set_string(ERROR_KEY, "legacy failure");
    assert_eq!(failure_of(&reply), Some(RemoteFailure::new(FailureKind::Handler, "legacy failure")));
}

#[test]
fn test_unit_reply_needs_no_keys() -> Result<()> {
    decode_reply::<()>(&WireMessage::new("x.y"))?;
    Ok(())
}

// ============================================================================
//  TYPED METHODS
// ============================================================================

struct Scan;

impl Method for Scan {
    const MODULE: &'static str = "calibration";
    const NAME: &'static str = "scan";
    type Args = (u8, [u32; 2]);
    type Output = Vec<(u32, u32)>;
}

#[test]
fn test_qualified_names() {
    assert_eq!(qualified_name::<Scan>(), "calibration.scan");
    assert_eq!(qualified_name::<ModuleLoad>(), MODULE_LOAD_METHOD);
}

#[test]
fn test_typed_call_and_reply() -> Result<()> {
    let request = encode_call(&qualified_name::<Scan>(), &(3u8, [10u32, 20]))?;
    let args: <Scan as Method>::Args = decode_args(&request)?;
    assert_eq!(args, (3, [10, 20]));

    let mut reply = WireMessage::new(request.method());
    let out: <Scan as Method>::Output = vec![(10, 1), (20, 4)];
    encode_result(&mut reply, &out)?;
    assert_eq!(decode_reply::<<Scan as Method>::Output>(&reply)?, out);
    Ok(())
}
