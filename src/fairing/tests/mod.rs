mod test_base_basic;
mod test_scan_basic;
mod test_shell_basic;
mod test_solver_basic;
