//! Built-in directive table.
//!
//! Registered once per registry. Handlers act on whichever load is staged
//! when they are dispatched, so the table survives across reloads.
//!
//! `$umask`, `$MaxOpenFiles` and `$ModDir` take effect immediately while
//! parsing: they change process-global state (or the module search path
//! later `$ModLoad` lines depend on). A load that fails afterwards does
//! not roll them back.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::schema::{QueueType, UnknownQueueType};
use crate::directive::handler::{field, optional_field, parse_word, Handler};
use crate::directive::registry::{DirectiveRegistry, Scope};
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::StagedConfig;
use crate::rules::NameLineKind;

/// Register every built-in directive into `registry`.
pub fn register_builtin_directives(registry: &DirectiveRegistry) -> ConfResult<()> {
    let table: Vec<(&str, Handler)> = vec![
        ("sleep", Handler::GoneAway),
        // global flags
        ("logrsyslogstatusmessages", Handler::Binary(field(|r| &mut r.globals.log_status_msgs))),
        ("errormessagestostderr", Handler::Binary(field(|r| &mut r.globals.err_msg_to_stderr))),
        ("abortonuncleanconfig", Handler::Binary(field(|r| &mut r.globals.abort_on_unclean_config))),
        ("repeatedmsgreduction", Handler::Binary(field(|r| &mut r.globals.reduce_repeat_msgs))),
        ("debugprinttemplatelist", Handler::Binary(field(|r| &mut r.globals.debug_print_template_list))),
        ("debugprintmodulelist", Handler::Binary(field(|r| &mut r.globals.debug_print_module_list))),
        ("debugprintcfsyslinehandlerlist", Handler::Binary(field(|r| &mut r.globals.debug_print_handler_list))),
        // privilege drop: resolved now, applied by the caller later
        ("privdroptouser", Handler::Uid(optional_field(|r| &mut r.globals.drop_priv_user))),
        ("privdroptouserid", Handler::int(set_drop_priv_user_id)),
        ("privdroptogroup", Handler::Gid(optional_field(|r| &mut r.globals.drop_priv_group))),
        ("privdroptogroupid", Handler::int(set_drop_priv_group_id)),
        ("generateconfiggraph", Handler::Word(optional_field(|r| &mut r.globals.config_graph_file))),
        ("maxopenfiles", Handler::int(set_max_open_files)),
        ("actionresumeinterval", Handler::Int(optional_field(|r| &mut r.globals.action_resume_interval))),
        ("modload", Handler::custom(load_module)),
        ("includeconfig", Handler::custom(include_config)),
        ("umask", Handler::FileCreateMode(Arc::new(set_umask))),
        ("maxmessagesize", Handler::Size(optional_field(|r| &mut r.globals.max_message_size))),
        ("defaultruleset", Handler::word(|staged, name| staged.set_default_ruleset(&name))),
        ("ruleset", Handler::word(|staged, name| staged.set_current_ruleset(&name))),
        // larger statements go to the rule compiler
        ("template", Handler::custom(|staged, line| staged.add_name_line(NameLineKind::Template, &line))),
        ("outchannel", Handler::custom(|staged, line| staged.add_name_line(NameLineKind::OutputChannel, &line))),
        ("allowedsender", Handler::custom(|staged, line| staged.add_name_line(NameLineKind::AllowedSender, &line))),
        // main message queue
        ("mainmsgqueuefilename", Handler::Word(optional_field(|r| &mut r.main_queue.file_name))),
        ("mainmsgqueuesize", Handler::Int(field(|r| &mut r.main_queue.size))),
        ("mainmsgqueuehighwatermark", Handler::Int(field(|r| &mut r.main_queue.high_watermark))),
        ("mainmsgqueuelowwatermark", Handler::Int(field(|r| &mut r.main_queue.low_watermark))),
        ("mainmsgqueuediscardmark", Handler::Int(field(|r| &mut r.main_queue.discard_mark))),
        ("mainmsgqueuediscardseverity", Handler::Severity(field(|r| &mut r.main_queue.discard_severity))),
        ("mainmsgqueuecheckpointinterval", Handler::Int(field(|r| &mut r.main_queue.checkpoint_interval))),
        ("mainmsgqueuesyncqueuefiles", Handler::Binary(field(|r| &mut r.main_queue.sync_queue_files))),
        ("mainmsgqueuetype", Handler::word(set_main_queue_type)),
        ("mainmsgqueueworkerthreads", Handler::Int(field(|r| &mut r.main_queue.worker_threads))),
        ("mainmsgqueuetimeoutshutdown", Handler::Int(field(|r| &mut r.main_queue.timeout_shutdown))),
        ("mainmsgqueuetimeoutactioncompletion", Handler::Int(field(|r| &mut r.main_queue.timeout_action_completion))),
        ("mainmsgqueuetimeoutenqueue", Handler::Int(field(|r| &mut r.main_queue.timeout_enqueue))),
        ("mainmsgqueueworkertimeoutthreadshutdown", Handler::Int(field(|r| &mut r.main_queue.timeout_worker_shutdown))),
        ("mainmsgqueuedequeueslowdown", Handler::Int(field(|r| &mut r.main_queue.dequeue_slowdown))),
        ("mainmsgqueueworkerthreadminimummessages", Handler::Int(field(|r| &mut r.main_queue.worker_min_messages))),
        ("mainmsgqueuemaxfilesize", Handler::Size(field(|r| &mut r.main_queue.max_file_size))),
        ("mainmsgqueuedequeuebatchsize", Handler::Size(field(|r| &mut r.main_queue.dequeue_batch_size))),
        ("mainmsgqueuemaxdiskspace", Handler::Size(field(|r| &mut r.main_queue.max_disk_space))),
        ("mainmsgqueuesaveonshutdown", Handler::Binary(field(|r| &mut r.main_queue.save_on_shutdown))),
        ("mainmsgqueuedequeuetimebegin", Handler::Int(field(|r| &mut r.main_queue.dequeue_time_begin))),
        ("mainmsgqueuedequeuetimeend", Handler::Int(field(|r| &mut r.main_queue.dequeue_time_end))),
        // must apply before later $ModLoad lines
        ("moddir", Handler::word(set_module_dir)),
    ];

    for (name, handler) in table {
        registry.register(name, Scope::Global, handler, false)?;
    }

    registry.register(
        "resetconfigvariables",
        Scope::Global,
        Handler::custom(reset_config_variables),
        true,
    )?;

    debug!(directives = registry.len(), "built-in directives registered");
    Ok(())
}

fn set_main_queue_type(staged: &mut StagedConfig, value: String) -> ConfResult<()> {
    let queue_type: QueueType = value
        .parse()
        .map_err(|e: UnknownQueueType| {
            ConfError::conversion("mainmsgqueuetype", &value, e.to_string())
        })?;
    staged.record_mut().main_queue.queue_type = queue_type;
    debug!(queue_type = %queue_type, "main message queue type set");
    Ok(())
}

fn set_drop_priv_user_id(staged: &mut StagedConfig, value: i64) -> ConfResult<()> {
    let uid = u32::try_from(value).map_err(|_| {
        ConfError::conversion("privdroptouserid", &value.to_string(), "not a valid user id")
    })?;
    staged.record_mut().globals.drop_priv_user = Some(uid);
    Ok(())
}

fn set_drop_priv_group_id(staged: &mut StagedConfig, value: i64) -> ConfResult<()> {
    let gid = u32::try_from(value).map_err(|_| {
        ConfError::conversion("privdroptogroupid", &value.to_string(), "not a valid group id")
    })?;
    staged.record_mut().globals.drop_priv_group = Some(gid);
    Ok(())
}

fn set_umask(staged: &mut StagedConfig, mode: u32) -> ConfResult<()> {
    staged.process().set_umask(mode);
    staged.record_mut().globals.umask = Some(mode);
    debug!(umask = %format!("{mode:04o}"), "umask set");
    Ok(())
}

fn set_max_open_files(staged: &mut StagedConfig, value: i64) -> ConfResult<()> {
    let limit = u64::try_from(value)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ConfError::conversion("maxopenfiles", &value.to_string(), "must be a positive number"))?;
    staged.process().set_max_open_files(limit)?;
    staged.record_mut().globals.max_open_files = Some(limit);
    info!(max_open_files = limit, "max number of files set");
    Ok(())
}

fn set_module_dir(staged: &mut StagedConfig, dir: String) -> ConfResult<()> {
    staged.modules().set_search_dir(&dir)?;
    staged.record_mut().globals.module_dir = Some(dir);
    Ok(())
}

fn load_module(staged: &mut StagedConfig, value: String) -> ConfResult<()> {
    let name = parse_word("modload", &value)?.to_string();
    let registry = staged.registry().clone();
    staged.modules().load(&name, &registry)?;
    let modules = &mut staged.record_mut().globals.modules;
    if !modules.iter().any(|m| m == &name) {
        modules.push(name);
    }
    Ok(())
}

fn include_config(staged: &mut StagedConfig, value: String) -> ConfResult<()> {
    let path = parse_word("includeconfig", &value)?;
    staged.queue_include(PathBuf::from(path));
    Ok(())
}

fn reset_config_variables(staged: &mut StagedConfig, _value: String) -> ConfResult<()> {
    staged.reset_defaults();
    debug!("config variables reset to defaults");
    Ok(())
}
